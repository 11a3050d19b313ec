use crate::error::{LectureError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caption file format written next to the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionFormat {
    #[default]
    Srt,
    Vtt,
}

impl std::fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionFormat::Srt => write!(f, "srt"),
            CaptionFormat::Vtt => write!(f, "vtt"),
        }
    }
}

impl std::str::FromStr for CaptionFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(CaptionFormat::Srt),
            "vtt" => Ok(CaptionFormat::Vtt),
            _ => Err(format!("Unknown caption format: {}. Use 'srt' or 'vtt'", s)),
        }
    }
}

impl CaptionFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionFormat::Srt => "srt",
            CaptionFormat::Vtt => "vtt",
        }
    }
}

/// How a narration transcript is built from a heading and its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptPolicy {
    /// Heading text is spoken first, then the content.
    #[default]
    WithHeading,
    /// Only the content is spoken; the heading is used when content is empty.
    ContentOnly,
}

impl std::fmt::Display for TranscriptPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptPolicy::WithHeading => write!(f, "with-heading"),
            TranscriptPolicy::ContentOnly => write!(f, "content-only"),
        }
    }
}

impl std::str::FromStr for TranscriptPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "with-heading" | "heading" => Ok(TranscriptPolicy::WithHeading),
            "content-only" | "content" => Ok(TranscriptPolicy::ContentOnly),
            _ => Err(format!(
                "Unknown transcript policy: {}. Use 'with-heading' or 'content-only'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub voice_language: String,
    pub tts_base_url: String,
    pub output_dir: PathBuf,
    pub words_per_caption: usize,
    pub transcript_policy: TranscriptPolicy,
    pub caption_format: CaptionFormat,
    pub fps: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-pro".to_string(),
            voice_language: "en".to_string(),
            tts_base_url: "https://translate.google.com".to_string(),
            output_dir: PathBuf::from("Video_lectures"),
            words_per_caption: 6,
            transcript_policy: TranscriptPolicy::default(),
            caption_format: CaptionFormat::default(),
            fps: 24,
            canvas_width: 1280,
            canvas_height: 720,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                match toml::from_str::<Config>(&contents) {
                    Ok(file_config) => config = file_config,
                    Err(e) => tracing::warn!(
                        "Ignoring unreadable config {}: {}",
                        config_path.display(),
                        e
                    ),
                }
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("LECTURECAST_MODEL") {
            self.gemini_model = model;
        }
        if let Ok(lang) = std::env::var("LECTURECAST_VOICE_LANG") {
            self.voice_language = lang;
        }
        if let Ok(dir) = std::env::var("LECTURECAST_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(words) = std::env::var("LECTURECAST_WORDS_PER_CAPTION") {
            if let Ok(n) = words.parse() {
                self.words_per_caption = n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.words_per_caption == 0 {
            return Err(LectureError::Config(
                "words_per_caption must be greater than 0".to_string(),
            ));
        }

        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(LectureError::Config(format!(
                "Canvas size must be non-zero (got {}x{})",
                self.canvas_width, self.canvas_height
            )));
        }

        if self.fps == 0 {
            return Err(LectureError::Config("fps must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Extra checks when the outline is produced by the generation service.
    pub fn validate_generation(&self) -> Result<()> {
        if self.gemini_api_key.is_none() {
            return Err(LectureError::Config(
                "GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey"
                    .to_string(),
            ));
        }
        self.validate()
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lecturecast").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_format_parsing() {
        assert_eq!("srt".parse::<CaptionFormat>().unwrap(), CaptionFormat::Srt);
        assert_eq!("VTT".parse::<CaptionFormat>().unwrap(), CaptionFormat::Vtt);
        assert!("ass".parse::<CaptionFormat>().is_err());
    }

    #[test]
    fn test_transcript_policy_parsing() {
        assert_eq!(
            "with-heading".parse::<TranscriptPolicy>().unwrap(),
            TranscriptPolicy::WithHeading
        );
        assert_eq!(
            "content".parse::<TranscriptPolicy>().unwrap(),
            TranscriptPolicy::ContentOnly
        );
        assert!("nope".parse::<TranscriptPolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.words_per_caption, 6);
        assert_eq!(config.fps, 24);
        assert_eq!((config.canvas_width, config.canvas_height), (1280, 720));
        assert_eq!(config.transcript_policy, TranscriptPolicy::WithHeading);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let config = Config {
            words_per_caption: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_generation_requires_key() {
        let mut config = Config::default();
        assert!(config.validate_generation().is_err());

        config.gemini_api_key = Some("test-key".to_string());
        assert!(config.validate_generation().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("words_per_caption = 4\ncaption_format = \"vtt\"").unwrap();
        assert_eq!(config.words_per_caption, 4);
        assert_eq!(config.caption_format, CaptionFormat::Vtt);
        assert_eq!(config.fps, 24);
    }
}
