//! Lecture content generation from a language model.
//!
//! Only [`Mode::Text`] output feeds the video pipeline; the other modes
//! produce plain text for documents and audio-only narration.

pub mod gemini;

use crate::error::{LectureError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub use gemini::GeminiGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Topic, headings and full content for a written handout.
    Pdf,
    /// Content only, for spoken narration.
    Audio,
    /// Topic and heading names only.
    Video,
    /// Outline object of slides and headings, ready for narration.
    #[default]
    Text,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Pdf, Mode::Audio, Mode::Video, Mode::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Pdf => "pdf",
            Mode::Audio => "audio",
            Mode::Video => "video",
            Mode::Text => "text",
        }
    }

    /// Whether the generated text is an outline the pipeline can consume.
    pub fn produces_outline(&self) -> bool {
        matches!(self, Mode::Text)
    }

    pub fn system_instruction(&self) -> &'static str {
        match self {
            Mode::Pdf => PDF_INSTRUCTION,
            Mode::Audio => AUDIO_INSTRUCTION,
            Mode::Video => VIDEO_INSTRUCTION,
            Mode::Text => OUTLINE_INSTRUCTION,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = LectureError;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                LectureError::Config(format!(
                    "Invalid mode '{}'. Choose from: pdf, audio, video, text",
                    s
                ))
            })
    }
}

const PDF_INSTRUCTION: &str = r#"You prepare lectures in a structured, document-friendly format.
Instructions:
1. Put the topic name at the very top.
2. Include every heading by its actual name, never the word "heading".
3. Give each heading its content in full detail.
4. Keep the order logical and clean.
5. Add no commentary outside the lecture content.
6. Use only the provided content. Do not invent unrelated material.
7. Leave out any personal contact information."#;

const AUDIO_INSTRUCTION: &str = r#"You prepare lecture content for audio narration.
Instructions:
1. Provide only the lecture's paragraphs.
2. Do not include the topic name.
3. Do not include any heading names.
4. Keep the flow natural for spoken audio.
5. Use only the provided content. Do not invent unrelated material.
6. Leave out any personal contact information."#;

const VIDEO_INSTRUCTION: &str = r#"You prepare lecture outlines for video.
Instructions:
1. Provide only the topic name and the names of all headings in the given context.
2. Do not include the content under each heading.
3. List the topic name first, then each heading on its own line.
4. Use only the provided content. Do not invent unrelated material.
5. Leave out any personal contact information."#;

const OUTLINE_INSTRUCTION: &str = r#"You extract headings and their paragraphs and return them as slides.
Output format (must be valid JSON):
{
    "Topic": "<topic name>",
    "Slide 1": {
        "<first heading>": "<paragraph for the first heading>",
        "<second heading>": "<paragraph for the second heading>"
    },
    "Slide 2": {
        "<fifth heading>": "<paragraph for the fifth heading>"
    }
}
Instructions:
1. Include the topic name under the "Topic" key.
2. Put at most four headings on a slide, then continue on the next slide.
3. Each slide's headings and paragraphs must be different from every other slide.
4. Use only the provided content. Do not invent unrelated material.
5. Leave out any personal contact information.
Rules:
- Return only valid JSON, with no explanations or extra text.
- Keep paragraph quotes intact and preserve the exact wording of the input.
- Do not add Markdown formatting such as ** or #.
- Put definitions or descriptions that are not headings into the paragraphs."#;

/// Build the user turn for a generation request.
pub fn user_prompt(task: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "Based only on the following content:\n\n{}\n\nTask: {}",
            context, task
        ),
        None => format!("Task: {}", task),
    }
}

#[async_trait]
pub trait OutlineGenerator: Send + Sync {
    /// Produce lecture text for `task` in the given mode.
    async fn generate(&self, mode: Mode, task: &str, context: Option<&str>) -> Result<String>;

    fn name(&self) -> &'static str;
}
