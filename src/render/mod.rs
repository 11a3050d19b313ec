//! Video encoding through a single ffmpeg invocation.
//!
//! Each segment becomes a lavfi `color` source overlaid with `drawtext`
//! filters for its layers. Video parts and narration audio are joined by two
//! separate `concat` filters, each cut at global frame or sample boundaries.

use crate::audio::check_ffmpeg;
use crate::compose::{Layer, Segment, TextStyle};
use crate::error::{LectureError, Result};
use crate::timeline::Timeline;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

const AUDIO_SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Optional font files; the ffmpeg default font is used otherwise.
    pub font_file: Option<PathBuf>,
    pub bold_font_file: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 24,
            font_file: None,
            bold_font_file: None,
        }
    }
}

/// A compiled ffmpeg command. Holds the scratch directory with the layer
/// text files, which is removed when the plan is dropped.
#[derive(Debug)]
pub struct RenderPlan {
    pub args: Vec<String>,
    pub output: PathBuf,
    scratch: TempDir,
}

impl RenderPlan {
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// The full command line, for logging and dry runs.
    pub fn command_line(&self) -> String {
        let mut line = String::from("ffmpeg");
        for arg in &self.args {
            line.push(' ');
            if arg.contains([' ', '\'', '[', ';']) {
                line.push('"');
                line.push_str(&arg.replace('"', "\\\""));
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

pub struct FfmpegRenderer {
    settings: RenderSettings,
}

impl FfmpegRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    /// Compile the ffmpeg arguments for `timeline` without running anything.
    pub fn plan(&self, timeline: &Timeline, output: &Path) -> Result<RenderPlan> {
        if timeline.is_empty() {
            return Err(LectureError::EmptyTimeline);
        }

        let scratch = tempfile::Builder::new()
            .prefix("lecturecast-render-")
            .tempdir()?;

        let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into()];
        let mut filters: Vec<String> = Vec::new();
        let mut video_parts = String::new();
        let mut audio_parts = String::new();

        let frames = boundary_spans(timeline, f64::from(self.settings.fps));
        let samples = boundary_spans(timeline, f64::from(AUDIO_SAMPLE_RATE));

        for (i, segment) in timeline.segments().iter().enumerate() {
            // One spare frame so the source never ends before the trim point.
            let source_secs = (frames[i] + 1) as f64 / f64::from(self.settings.fps);

            args.extend([
                "-f".into(),
                "lavfi".into(),
                "-t".into(),
                format_secs(source_secs),
                "-i".into(),
                format!(
                    "color=c={}:s={}x{}:r={}",
                    background_hex(segment),
                    self.settings.width,
                    self.settings.height,
                    self.settings.fps
                ),
                "-i".into(),
                segment.audio().path().to_string_lossy().into_owned(),
            ]);

            let video_input = 2 * i;
            let audio_input = 2 * i + 1;

            let mut chain = Vec::new();
            for (j, layer) in segment.layers().iter().enumerate() {
                if let Some(filter) = self.layer_filter(segment, layer, i, j, scratch.path())? {
                    chain.push(filter);
                }
            }
            chain.push(format!("trim=end_frame={}", frames[i]));
            chain.push("setpts=PTS-STARTPTS".into());
            chain.push("setsar=1".into());

            filters.push(format!("[{video_input}:v]{}[v{i}]", chain.join(",")));
            filters.push(format!(
                "[{audio_input}:a]aformat=sample_rates={AUDIO_SAMPLE_RATE}:channel_layouts=stereo,apad,atrim=end_sample={},asetpts=PTS-STARTPTS[a{i}]",
                samples[i]
            ));
            video_parts.push_str(&format!("[v{i}]"));
            audio_parts.push_str(&format!("[a{i}]"));
        }

        // Audio is joined on its own so its length never follows the frame grid.
        filters.push(format!(
            "{video_parts}concat=n={}:v=1:a=0[outv]",
            timeline.len()
        ));
        filters.push(format!(
            "{audio_parts}concat=n={}:v=0:a=1[outa]",
            timeline.len()
        ));

        args.extend([
            "-filter_complex".into(),
            filters.join(";"),
            "-map".into(),
            "[outv]".into(),
            "-map".into(),
            "[outa]".into(),
            "-r".into(),
            self.settings.fps.to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-movflags".into(),
            "+faststart".into(),
            output.to_string_lossy().into_owned(),
        ]);

        debug!(
            "Compiled render plan: {} inputs, {} filters",
            timeline.len() * 2,
            filters.len()
        );

        Ok(RenderPlan {
            args,
            output: output.to_path_buf(),
            scratch,
        })
    }

    /// Encode `timeline` to `output`, creating its directory if needed.
    pub fn render(&self, timeline: &Timeline, output: &Path) -> Result<PathBuf> {
        check_ffmpeg()?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let plan = self.plan(timeline, output)?;
        info!(
            "Encoding {:.1}s video to {}",
            timeline.duration(),
            output.display()
        );
        debug!("{}", plan.command_line());

        let result = Command::new("ffmpeg")
            .args(&plan.args)
            .output()
            .map_err(|e| LectureError::Render(format!("Failed to run FFmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(8).collect();
            return Err(LectureError::Render(format!(
                "FFmpeg exited with {:?}: {}",
                result.status.code(),
                tail.into_iter().rev().collect::<Vec<_>>().join("\n")
            )));
        }

        if !output.exists() {
            return Err(LectureError::Render(
                "Output file was not created".to_string(),
            ));
        }

        Ok(output.to_path_buf())
    }

    fn layer_filter(
        &self,
        segment: &Segment,
        layer: &Layer,
        segment_index: usize,
        layer_index: usize,
        scratch: &Path,
    ) -> Result<Option<String>> {
        if let Layer::Background { border, inset, .. } = layer {
            if *inset == 0 || inset * 2 >= self.settings.width.min(self.settings.height) {
                return Ok(None);
            }
            return Ok(Some(format!(
                "drawbox=x={inset}:y={inset}:w={}:h={}:color={}:t=fill",
                self.settings.width - inset * 2,
                self.settings.height - inset * 2,
                border.hex()
            )));
        }

        let (Some(text), Some(style)) = (layer.text(), layer.style()) else {
            return Ok(None);
        };
        let y = match layer {
            Layer::Title { y, .. } | Layer::Heading { y, .. } | Layer::Caption { y, .. } => *y,
            Layer::Background { .. } => 0,
        };

        let text_path = scratch.join(format!("s{segment_index:03}_l{layer_index:03}.txt"));
        std::fs::write(&text_path, text)?;

        let mut filter = format!(
            "drawtext=textfile='{}':expansion=none:fontsize={}:fontcolor={}:x=(w-text_w)/2:y={}",
            escape_ffmpeg_path(&text_path),
            style.font_size,
            style.color.hex(),
            y
        );
        filter.push_str(&self.font_options(style));

        if let Layer::Caption { .. } = layer {
            let (start, end) = layer.visibility(segment.duration());
            filter.push_str(&format!(
                ":enable='gte(t,{})*lt(t,{})'",
                format_secs(start),
                format_secs(end)
            ));
        }

        Ok(Some(filter))
    }

    fn font_options(&self, style: &TextStyle) -> String {
        let file = if style.bold {
            self.settings
                .bold_font_file
                .as_ref()
                .or(self.settings.font_file.as_ref())
        } else {
            self.settings.font_file.as_ref()
        };

        let mut options = String::new();
        if let Some(file) = file {
            options.push_str(&format!(":fontfile='{}'", escape_ffmpeg_path(file)));
        }
        if style.bold && self.settings.bold_font_file.is_none() {
            // Faux bold when no bold face is available.
            options.push_str(&format!(":borderw=1:bordercolor={}", style.color.hex()));
        }
        options
    }
}

fn background_hex(segment: &Segment) -> String {
    segment
        .layers()
        .iter()
        .find_map(|l| match l {
            Layer::Background { color, .. } => Some(color.hex()),
            _ => None,
        })
        .unwrap_or_else(|| "0x000000".to_string())
}

/// Per-segment unit counts (frames or samples) cut at global boundaries, so
/// rounding never accumulates along the timeline. Every segment gets at
/// least one unit.
fn boundary_spans(timeline: &Timeline, rate: f64) -> Vec<u64> {
    let mut spans = Vec::with_capacity(timeline.len());
    let mut previous = 0u64;
    for placement in timeline.placements() {
        let boundary = ((placement.end * rate).round() as u64).max(previous + 1);
        spans.push(boundary - previous);
        previous = boundary;
    }
    spans
}

fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs)
}

fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioAsset;
    use crate::compose::{SegmentComposer, Theme};
    use crate::narration::NarrationUnit;

    fn timeline_of(dir: &TempDir, units: &[(&str, &str, f64)]) -> Timeline {
        let composer = SegmentComposer::default();
        let headings: Vec<String> = units.iter().map(|(h, _, _)| h.to_string()).collect();
        let segments = units
            .iter()
            .enumerate()
            .map(|(i, (heading, transcript, duration))| {
                let path = dir.path().join(format!("h{i}.mp3"));
                std::fs::write(&path, b"audio").unwrap();
                let unit = NarrationUnit {
                    slide_name: "Ethics".into(),
                    slide_index: 1,
                    heading: heading.to_string(),
                    heading_index: i,
                    transcript: transcript.to_string(),
                    audio: AudioAsset::new(path, *duration),
                    used_fallback: false,
                };
                composer.compose(unit, &headings, i).unwrap()
            })
            .collect();
        Timeline::assemble(segments).unwrap()
    }

    fn timeline(dir: &TempDir) -> Timeline {
        timeline_of(
            dir,
            &[
                ("Intro", "Intro. Ethics studies right action.", 3.0),
                ("Virtue", "Virtue. Virtue ethics focuses on character.", 4.0),
            ],
        )
    }

    fn filter_graph(plan: &RenderPlan) -> &str {
        let idx = plan.args.iter().position(|a| a == "-filter_complex").unwrap();
        &plan.args[idx + 1]
    }

    #[test]
    fn test_plan_structure() {
        let dir = TempDir::new().unwrap();
        let timeline = timeline(&dir);
        let renderer = FfmpegRenderer::new(RenderSettings::default());
        let plan = renderer.plan(&timeline, Path::new("/out/video.mp4")).unwrap();

        assert_eq!(plan.args.last().unwrap(), "/out/video.mp4");
        assert_eq!(plan.args.iter().filter(|a| *a == "lavfi").count(), 2);

        let filter = filter_graph(&plan);
        assert!(filter.contains("[v0][v1]concat=n=2:v=1:a=0[outv]"));
        assert!(filter.contains("[a0][a1]concat=n=2:v=0:a=1[outa]"));
        // 3s and 4s at 24 fps and 44.1 kHz
        assert!(filter.contains("trim=end_frame=72,"));
        assert!(filter.contains("trim=end_frame=96,"));
        assert!(filter.contains("atrim=end_sample=132300,"));
        assert!(filter.contains("atrim=end_sample=176400,"));
        assert!(filter.contains("color=0x28283C"));
    }

    #[test]
    fn test_audio_is_not_tied_to_frame_grid() {
        let dir = TempDir::new().unwrap();
        // 3.01s is not a whole number of frames at 24 fps.
        let timeline = timeline_of(
            &dir,
            &[
                ("A", "alpha", 3.01),
                ("B", "beta", 3.01),
                ("C", "gamma", 3.01),
            ],
        );
        let plan = FfmpegRenderer::new(RenderSettings::default())
            .plan(&timeline, Path::new("out.mp4"))
            .unwrap();
        let filter = filter_graph(&plan);

        // Audio and video are never paired in one concat.
        assert!(!filter.contains("[v0][a0]"));
        assert!(!filter.contains(":v=1:a=1"));

        let audio_chains: Vec<&str> = filter
            .split(';')
            .filter(|f| f.contains("atrim="))
            .collect();
        assert_eq!(audio_chains.len(), 3);
        for chain in &audio_chains {
            assert!(!chain.contains("end_frame"));
        }

        let count = |key: &str| -> u64 {
            filter
                .split(';')
                .flat_map(|f| f.split(','))
                .filter_map(|f| f.strip_prefix(key))
                .map(|n| n.parse::<u64>().unwrap())
                .sum()
        };

        // Totals match the global clock exactly, so no segment drifts.
        let total = timeline.duration();
        assert_eq!(count("atrim=end_sample="), (total * 44100.0).round() as u64);
        assert_eq!(count("trim=end_frame="), (total * 24.0).round() as u64);
        assert!(filter.contains("trim=end_frame=72,"));
        assert!(filter.contains("trim=end_frame=73,"));
    }

    #[test]
    fn test_boundary_spans_never_empty() {
        let dir = TempDir::new().unwrap();
        let timeline = timeline_of(&dir, &[("A", "a", 0.01), ("B", "b", 1.0)]);
        let spans = boundary_spans(&timeline, 24.0);
        assert_eq!(spans, vec![1, 23]);
    }

    #[test]
    fn test_caption_enable_uses_local_clock() {
        let dir = TempDir::new().unwrap();
        let timeline = timeline(&dir);
        let plan = FfmpegRenderer::new(RenderSettings::default())
            .plan(&timeline, Path::new("out.mp4"))
            .unwrap();
        let filter = filter_graph(&plan);

        // Second segment's single caption window is [0, 4) on its own clock.
        let second = filter.split(';').find(|f| f.starts_with("[2:v]")).unwrap();
        assert!(second.contains("enable='gte(t,0.000)*lt(t,4.000)'"));
    }

    #[test]
    fn test_layer_text_files_written() {
        let dir = TempDir::new().unwrap();
        let timeline = timeline(&dir);
        let plan = FfmpegRenderer::new(RenderSettings::default())
            .plan(&timeline, Path::new("out.mp4"))
            .unwrap();

        let texts: Vec<String> = std::fs::read_dir(plan.scratch_dir())
            .unwrap()
            .map(|e| std::fs::read_to_string(e.unwrap().path()).unwrap())
            .collect();
        assert!(texts.iter().any(|t| t == "Ethics"));
        assert!(texts.iter().any(|t| t == "Virtue"));

        let highlighted = Theme::default().heading_highlighted.color.hex();
        assert!(plan.command_line().contains(&highlighted));
    }

    #[test]
    fn test_escape_ffmpeg_path() {
        assert_eq!(escape_ffmpeg_path(Path::new("/simple/path.txt")), "/simple/path.txt");
        assert_eq!(escape_ffmpeg_path(Path::new("C:/x")), "C\\:/x");
        assert_eq!(escape_ffmpeg_path(Path::new("/it's")), "/it'\\''s");
    }
}
