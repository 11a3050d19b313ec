use crate::compose::{Segment, SegmentComposer, Theme};
use crate::config::{CaptionFormat, Config, TranscriptPolicy};
use crate::error::Result;
use crate::narration::{Narration, NarrationBuilder, UnitOutcome, UnitReport};
use crate::outline::Outline;
use crate::render::{FfmpegRenderer, RenderSettings};
use crate::subtitle::{self, UnitCaptions};
use crate::synth::Synthesizer;
use crate::timeline::Timeline;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for one lecture assembly run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory receiving the caption file and the video.
    pub output_dir: PathBuf,
    /// Base name of the output artifacts.
    pub name: String,
    /// Where narration audio is written. Defaults to `<output_dir>/<name>_audio`.
    pub work_dir: Option<PathBuf>,
    pub caption_format: CaptionFormat,
    pub words_per_caption: usize,
    pub transcript_policy: TranscriptPolicy,
    pub render: RenderSettings,
    /// Show progress bars.
    pub show_progress: bool,
    /// Compose and export captions, but only plan the encode.
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default(), "lecture")
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config, name: impl Into<String>) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            name: name.into(),
            work_dir: None,
            caption_format: config.caption_format,
            words_per_caption: config.words_per_caption,
            transcript_policy: config.transcript_policy,
            render: RenderSettings {
                width: config.canvas_width,
                height: config.canvas_height,
                fps: config.fps,
                ..RenderSettings::default()
            },
            show_progress: true,
            dry_run: false,
        }
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join(format!("{}_audio", self.name)))
    }

    pub fn caption_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.name, self.caption_format.extension()))
    }

    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", self.name))
    }
}

/// Statistics from the assembly run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub narration_time: Duration,
    pub compose_time: Duration,
    pub render_time: Duration,
    pub caption_entries: usize,
    pub synthesizer: String,
}

/// What the run produced and what it skipped, per heading.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub units: Vec<UnitReport>,
    /// Outline entries that were not slide mappings.
    pub skipped_entries: Vec<String>,
    pub segments: usize,
    /// Total timeline duration in seconds.
    pub duration: f64,
    pub caption_path: PathBuf,
    /// `None` on dry runs.
    pub video_path: Option<PathBuf>,
    /// The planned encoder command on dry runs.
    pub render_command: Option<String>,
    pub audio_dir: PathBuf,
    pub stats: PipelineStats,
}

impl PipelineReport {
    pub fn count(&self, pred: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.units.iter().filter(|u| pred(&u.outcome)).count()
    }

    pub fn narrated(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Narrated))
    }

    pub fn fallbacks(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Fallback))
    }

    /// Headings that did not make it into the timeline.
    pub fn skipped(&self) -> usize {
        self.count(|o| !o.produced_unit())
    }
}

/// A finished run. The timeline still owns the narration audio until
/// [`PipelineResult::finish`] releases it.
#[derive(Debug)]
pub struct PipelineResult {
    pub report: PipelineReport,
    pub timeline: Timeline,
}

impl PipelineResult {
    /// Release all audio assets, deleting them when `delete_audio` is set.
    pub fn finish(self, delete_audio: bool) -> PipelineReport {
        let removed = self.timeline.release(delete_audio);
        if delete_audio {
            info!("Removed {} narration files", removed);
            // Only succeeds once the directory is empty.
            if fs::remove_dir(&self.report.audio_dir).is_ok() {
                debug!("Removed {}", self.report.audio_dir.display());
            }
        }
        self.report
    }
}

fn spinner(show: bool, message: &str) -> Option<ProgressBar> {
    show.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    })
}

/// Compose every unit against its slide's heading list.
///
/// Units whose audio is unusable are skipped and their report entry is
/// rewritten; the walk continues.
pub fn compose_units(
    outline: &Outline,
    narration: Narration,
    composer: &SegmentComposer,
) -> (Vec<Segment>, Vec<UnitReport>) {
    let Narration { units, mut reports } = narration;

    // Units were emitted exactly for the reports that produced one, in order.
    let unit_reports: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.outcome.produced_unit())
        .map(|(i, _)| i)
        .collect();

    let mut segments = Vec::with_capacity(units.len());
    for (unit, report_index) in units.into_iter().zip(unit_reports) {
        let headings = outline
            .slides()
            .get(unit.slide_index.saturating_sub(1))
            .filter(|s| s.name == unit.slide_name)
            .or_else(|| outline.find_slide(&unit.slide_name))
            .map(|s| s.heading_titles())
            .unwrap_or_else(|| vec![unit.heading.clone()]);
        let highlight = unit.heading_index;
        let heading = unit.heading.clone();

        match composer.compose(unit, &headings, highlight) {
            Ok(segment) => segments.push(segment),
            Err(e) => {
                warn!("Skipping '{}': {}", heading, e);
                reports[report_index].outcome = UnitOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        }
    }

    (segments, reports)
}

/// Assemble a narrated lecture video from raw outline text.
///
/// Stages:
/// 1. Parse the outline (fatal on failure)
/// 2. Synthesize one narration unit per heading, with heading-only fallback
/// 3. Compose segments and concatenate them into a timeline
/// 4. Export captions on the global clock
/// 5. Encode the video (planned only on dry runs)
pub async fn run_pipeline(
    outline_text: &str,
    synthesizer: Box<dyn Synthesizer>,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    let start_time = Instant::now();
    let synthesizer_name = synthesizer.name().to_string();

    // Stage 1: outline
    info!("Stage 1/5: Parsing outline");
    let outline = Outline::parse(outline_text)?;
    let skipped_entries: Vec<String> = outline.skipped_entries().map(str::to_string).collect();
    info!(
        "Outline has {} slides with {} headings",
        outline.narrated_slides().count(),
        outline.heading_count()
    );

    // Stage 2: narration
    info!("Stage 2/5: Synthesizing narration");
    let narration_start = Instant::now();
    let audio_dir = config.audio_dir();
    let narration = NarrationBuilder::new(synthesizer, &audio_dir)
        .with_policy(config.transcript_policy)
        .with_progress(config.show_progress)
        .build(&outline)
        .await?;
    let narration_time = narration_start.elapsed();

    // Stage 3: composition
    info!("Stage 3/5: Composing segments");
    let compose_start = Instant::now();
    let composer = SegmentComposer::new(
        Theme::for_canvas(config.render.width, config.render.height),
        config.words_per_caption,
    );
    let (segments, units) = compose_units(&outline, narration, &composer);
    for report in &units {
        info!("  {} / {}: {}", report.slide_name, report.heading, report.outcome);
    }
    let timeline = Timeline::assemble(segments)?;
    let compose_time = compose_start.elapsed();

    // Stage 4: captions
    info!("Stage 4/5: Writing {} captions", config.caption_format);
    fs::create_dir_all(&config.output_dir)?;
    let caption_path = config.caption_path();
    let entries = subtitle::global_entries(timeline.segments().iter().map(UnitCaptions::from));
    let caption_text =
        subtitle::create_formatter(config.caption_format).format(&entries);
    fs::write(&caption_path, caption_text)?;
    info!("Wrote {} captions to {}", entries.len(), caption_path.display());

    // Stage 5: video
    let render_start = Instant::now();
    let renderer = FfmpegRenderer::new(config.render.clone());
    let (video_path, render_command) = if config.dry_run {
        info!("Stage 5/5: Dry run, planning encode only");
        let plan = renderer.plan(&timeline, &config.video_path())?;
        (None, Some(plan.command_line()))
    } else {
        info!("Stage 5/5: Encoding video");
        let pb = spinner(config.show_progress, "Encoding video...");
        let path = renderer.render(&timeline, &config.video_path())?;
        if let Some(pb) = pb {
            pb.finish_with_message(format!("✓ Video written ({:.1}s)", timeline.duration()));
        }
        (Some(path), None)
    };
    let render_time = render_start.elapsed();

    let report = PipelineReport {
        units,
        skipped_entries,
        segments: timeline.len(),
        duration: timeline.duration(),
        caption_path,
        video_path,
        render_command,
        audio_dir,
        stats: PipelineStats {
            total_time: start_time.elapsed(),
            narration_time,
            compose_time,
            render_time,
            caption_entries: entries.len(),
            synthesizer: synthesizer_name,
        },
    };

    Ok(PipelineResult { report, timeline })
}

/// Print a summary of the run.
pub fn print_summary(report: &PipelineReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Lecture Assembly Complete                 ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    if let Some(ref video) = report.video_path {
        println!("  Video:      {}", video.display());
    }
    println!("  Captions:   {}", report.caption_path.display());
    println!("  Segments:   {} ({:.1}s)", report.segments, report.duration);
    println!(
        "  Headings:   {} narrated, {} fallback, {} skipped",
        report.narrated(),
        report.fallbacks(),
        report.skipped()
    );
    println!("  Voice:      {}", report.stats.synthesizer);
    println!();

    let problems: Vec<&UnitReport> = report
        .units
        .iter()
        .filter(|u| !matches!(u.outcome, UnitOutcome::Narrated))
        .collect();
    if !problems.is_empty() {
        println!("  Attention:");
        for unit in problems {
            println!("    {} / {}: {}", unit.slide_name, unit.heading, unit.outcome);
        }
        println!();
    }
    if !report.skipped_entries.is_empty() {
        println!("  Ignored entries: {}", report.skipped_entries.join(", "));
        println!();
    }

    println!("  Timing:");
    println!(
        "    Narrate:   {:.2}s",
        report.stats.narration_time.as_secs_f64()
    );
    println!(
        "    Compose:   {:.2}s",
        report.stats.compose_time.as_secs_f64()
    );
    println!(
        "    Encode:    {:.2}s",
        report.stats.render_time.as_secs_f64()
    );
    println!(
        "    Total:     {:.2}s",
        report.stats.total_time.as_secs_f64()
    );
    if let Some(ref command) = report.render_command {
        println!();
        println!("  Dry run, encoder command:");
        println!("    {}", command);
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_paths() {
        let config = PipelineConfig {
            output_dir: PathBuf::from("/out"),
            name: "ethics".into(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.caption_path(), PathBuf::from("/out/ethics.srt"));
        assert_eq!(config.video_path(), PathBuf::from("/out/ethics.mp4"));
        assert_eq!(config.audio_dir(), PathBuf::from("/out/ethics_audio"));

        let config = PipelineConfig {
            work_dir: Some(PathBuf::from("/tmp/a")),
            caption_format: CaptionFormat::Vtt,
            ..config
        };
        assert_eq!(config.audio_dir(), PathBuf::from("/tmp/a"));
        assert_eq!(config.caption_path(), PathBuf::from("/out/ethics.vtt"));
    }

    #[test]
    fn test_pipeline_config_from_config() {
        let config = Config {
            fps: 30,
            words_per_caption: 4,
            ..Config::default()
        };
        let pipeline = PipelineConfig::from_config(&config, "x");
        assert_eq!(pipeline.render.fps, 30);
        assert_eq!(pipeline.words_per_caption, 4);
        assert_eq!(pipeline.output_dir, PathBuf::from("Video_lectures"));
        assert!(!pipeline.dry_run);
    }

    #[test]
    fn test_report_counts() {
        let unit = |outcome| UnitReport {
            slide_name: "S".into(),
            heading: "H".into(),
            outcome,
        };
        let report = PipelineReport {
            units: vec![
                unit(UnitOutcome::Narrated),
                unit(UnitOutcome::Fallback),
                unit(UnitOutcome::Dropped { reason: "x".into() }),
                unit(UnitOutcome::Skipped { reason: "y".into() }),
            ],
            skipped_entries: vec![],
            segments: 2,
            duration: 5.0,
            caption_path: PathBuf::from("a.srt"),
            video_path: None,
            render_command: None,
            audio_dir: PathBuf::from("audio"),
            stats: PipelineStats::default(),
        };
        assert_eq!(report.narrated(), 1);
        assert_eq!(report.fallbacks(), 1);
        assert_eq!(report.skipped(), 2);
    }
}
