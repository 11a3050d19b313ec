//! Narration units: one synthesized clip per (slide, heading).

use crate::audio::AudioAsset;
use crate::caption::{self, ChunkWindow};
use crate::config::TranscriptPolicy;
use crate::error::{LectureError, Result};
use crate::outline::{Heading, Outline};
use crate::synth::Synthesizer;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// Joins the heading and each content piece into one spoken transcript.
pub const TRANSCRIPT_SEPARATOR: &str = ". ";

/// One heading's narration and its audio.
#[derive(Debug)]
pub struct NarrationUnit {
    pub slide_name: String,
    /// 1-based position of the slide among all outline entries.
    pub slide_index: usize,
    pub heading: String,
    /// 0-based position of the heading within its slide.
    pub heading_index: usize,
    pub transcript: String,
    pub audio: AudioAsset,
    pub used_fallback: bool,
}

impl NarrationUnit {
    pub fn duration(&self) -> f64 {
        self.audio.duration()
    }

    /// Caption windows on this unit's local clock.
    pub fn windows(&self, words_per_chunk: usize) -> Vec<ChunkWindow> {
        caption::chunk_with(&self.transcript, self.duration(), words_per_chunk)
    }
}

/// What happened to a heading during the run.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// Full transcript narrated.
    Narrated,
    /// Full transcript failed; heading-only narration succeeded.
    Fallback,
    /// Both attempts failed; no unit was emitted.
    Dropped { reason: String },
    /// Not attempted or removed later (empty transcript, unusable audio).
    Skipped { reason: String },
}

impl UnitOutcome {
    pub fn produced_unit(&self) -> bool {
        matches!(self, UnitOutcome::Narrated | UnitOutcome::Fallback)
    }
}

impl std::fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitOutcome::Narrated => write!(f, "narrated"),
            UnitOutcome::Fallback => write!(f, "fallback"),
            UnitOutcome::Dropped { reason } => write!(f, "dropped ({reason})"),
            UnitOutcome::Skipped { reason } => write!(f, "skipped ({reason})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitReport {
    pub slide_name: String,
    pub heading: String,
    pub outcome: UnitOutcome,
}

/// Units in traversal order plus a report line per heading.
#[derive(Debug, Default)]
pub struct Narration {
    pub units: Vec<NarrationUnit>,
    pub reports: Vec<UnitReport>,
}

/// Build the spoken transcript for a heading.
pub fn build_transcript(heading: &Heading, policy: TranscriptPolicy) -> String {
    let title = heading.title.trim();
    let parts = heading.content.parts();

    let mut pieces: Vec<&str> = Vec::with_capacity(parts.len() + 1);
    match policy {
        TranscriptPolicy::WithHeading => {
            if !title.is_empty() {
                pieces.push(title);
            }
            pieces.extend(parts);
        }
        TranscriptPolicy::ContentOnly => {
            pieces.extend(parts);
            if pieces.is_empty() && !title.is_empty() {
                pieces.push(title);
            }
        }
    }

    pieces.join(TRANSCRIPT_SEPARATOR)
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\-.]").expect("Invalid regex"))
}

/// Longest heading part of an asset file name, in bytes. Keeps names well
/// under the usual 255-byte file name limit.
const MAX_TITLE_BYTES: usize = 120;

/// Asset file name for a heading's full narration.
///
/// The slide and heading indices keep names unique, so the heading text is
/// cut on a character boundary once it reaches `MAX_TITLE_BYTES`.
pub fn asset_file_name(slide: usize, heading: usize, title: &str, ext: &str) -> String {
    let title = unsafe_chars().replace_all(title.trim(), "_");
    let mut end = title.len().min(MAX_TITLE_BYTES);
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    format!("slide_{slide}_heading_{heading}_{}.{ext}", &title[..end])
}

/// Asset file name for a heading's fallback narration.
pub fn fallback_file_name(slide: usize, heading: usize, ext: &str) -> String {
    format!("slide_{slide}_heading_{heading}_fallback.{ext}")
}

/// Walks an outline and synthesizes one unit per heading.
pub struct NarrationBuilder {
    synthesizer: Box<dyn Synthesizer>,
    work_dir: PathBuf,
    policy: TranscriptPolicy,
    show_progress: bool,
}

impl NarrationBuilder {
    pub fn new(synthesizer: Box<dyn Synthesizer>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            synthesizer,
            work_dir: work_dir.into(),
            policy: TranscriptPolicy::default(),
            show_progress: true,
        }
    }

    pub fn with_policy(mut self, policy: TranscriptPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Synthesize every heading in slide order, then heading order.
    ///
    /// Synthesis failures never abort the walk; they become fallback or
    /// dropped outcomes in the returned report.
    pub async fn build(&self, outline: &Outline) -> Result<Narration> {
        std::fs::create_dir_all(&self.work_dir)?;

        let total = outline.heading_count();
        info!(
            "Synthesizing {} headings with {} into {}",
            total,
            self.synthesizer.name(),
            self.work_dir.display()
        );

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} headings {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut narration = Narration::default();

        for (slide_index, slide, headings) in outline.narrated_slides() {
            debug!("Processing slide {}: {}", slide_index, slide.name);

            for (heading_index, heading) in headings.iter().enumerate() {
                if let Some(ref pb) = progress_bar {
                    pb.set_message(heading.title.clone());
                }

                let (unit, outcome) = self
                    .build_unit(&slide.name, slide_index, heading_index, heading)
                    .await;

                if let Some(unit) = unit {
                    narration.units.push(unit);
                }
                narration.reports.push(UnitReport {
                    slide_name: slide.name.clone(),
                    heading: heading.title.clone(),
                    outcome,
                });

                if let Some(ref pb) = progress_bar {
                    pb.inc(1);
                }
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("done");
        }

        info!(
            "Narration complete: {}/{} headings produced audio",
            narration.units.len(),
            total
        );

        Ok(narration)
    }

    async fn build_unit(
        &self,
        slide_name: &str,
        slide_index: usize,
        heading_index: usize,
        heading: &Heading,
    ) -> (Option<NarrationUnit>, UnitOutcome) {
        let transcript = build_transcript(heading, self.policy);
        if transcript.trim().is_empty() {
            warn!("Skipping empty transcript for '{}' in '{}'", heading.title, slide_name);
            return (
                None,
                UnitOutcome::Skipped {
                    reason: "empty transcript".to_string(),
                },
            );
        }

        let ext = self.synthesizer.extension();
        let heading_number = heading_index + 1;
        let unit = |transcript: String, audio: AudioAsset, used_fallback: bool| NarrationUnit {
            slide_name: slide_name.to_string(),
            slide_index,
            heading: heading.title.clone(),
            heading_index,
            transcript,
            audio,
            used_fallback,
        };

        let full_path = self
            .work_dir
            .join(asset_file_name(slide_index, heading_number, &heading.title, ext));

        let first_error = match self.attempt(&transcript, &full_path).await {
            Ok(audio) => {
                debug!("Narrated '{}' ({:.2}s)", heading.title, audio.duration());
                return (Some(unit(transcript, audio, false)), UnitOutcome::Narrated);
            }
            Err(e) => e,
        };

        warn!(
            "Synthesis failed for '{}': {}; retrying with heading only",
            heading.title, first_error
        );

        let fallback_text = heading.title.trim().to_string();
        if fallback_text.is_empty() {
            error!("No fallback possible for untitled heading in '{}'", slide_name);
            return (
                None,
                UnitOutcome::Dropped {
                    reason: first_error.to_string(),
                },
            );
        }

        let fallback_path = self
            .work_dir
            .join(fallback_file_name(slide_index, heading_number, ext));

        match self.attempt(&fallback_text, &fallback_path).await {
            Ok(audio) => {
                info!("Fallback narration used for '{}'", heading.title);
                (Some(unit(fallback_text, audio, true)), UnitOutcome::Fallback)
            }
            Err(e) => {
                error!("Dropping '{}' from '{}': {}", heading.title, slide_name, e);
                (
                    None,
                    UnitOutcome::Dropped {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    /// Synthesize and verify one asset. Unverified output is discarded.
    async fn attempt(&self, text: &str, dest: &Path) -> Result<AudioAsset> {
        let asset = self.synthesizer.synthesize(text, dest).await?;

        let size = std::fs::metadata(asset.path()).map(|m| m.len()).unwrap_or(0);
        if size < self.synthesizer.min_output_bytes() {
            return Err(LectureError::Synthesis(format!(
                "{} too small ({} bytes)",
                asset.path().display(),
                size
            )));
        }

        asset
            .verify()
            .map_err(|e| LectureError::Synthesis(e.to_string()))?;

        Ok(asset.keep())
    }
}
