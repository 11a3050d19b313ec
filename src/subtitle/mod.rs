//! Caption file export.
//!
//! Per-unit caption windows live on each unit's local clock. Export walks the
//! units in timeline order with a running offset so every entry lands on the
//! global clock of the concatenated audio.

pub mod srt;
pub mod vtt;

use crate::caption::ChunkWindow;
use crate::compose::Segment;
use crate::config::CaptionFormat;
use crate::narration::NarrationUnit;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

pub trait SubtitleFormatter {
    fn format(&self, entries: &[SubtitleEntry]) -> String;
    fn extension(&self) -> &'static str;
}

pub fn create_formatter(format: CaptionFormat) -> Box<dyn SubtitleFormatter> {
    match format {
        CaptionFormat::Srt => Box::new(srt::SrtFormatter),
        CaptionFormat::Vtt => Box::new(vtt::VttFormatter),
    }
}

/// One unit's captions on its local clock.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCaptions {
    pub duration: f64,
    pub windows: Vec<ChunkWindow>,
}

impl UnitCaptions {
    pub fn from_unit(unit: &NarrationUnit, words_per_chunk: usize) -> Self {
        Self {
            duration: unit.duration(),
            windows: unit.windows(words_per_chunk),
        }
    }
}

impl From<&Segment> for UnitCaptions {
    fn from(segment: &Segment) -> Self {
        Self {
            duration: segment.duration(),
            windows: segment.captions().cloned().collect(),
        }
    }
}

/// Numbered entries on the global clock.
pub fn global_entries<I>(units: I) -> Vec<SubtitleEntry>
where
    I: IntoIterator<Item = UnitCaptions>,
{
    let mut entries = Vec::new();
    let mut offset = 0.0;

    for unit in units {
        for window in &unit.windows {
            entries.push(SubtitleEntry {
                index: entries.len() + 1,
                start: seconds(offset + window.start),
                end: seconds(offset + window.end),
                text: window.text.clone(),
            });
        }
        offset += unit.duration;
    }

    entries
}

/// Render caption file text for units in timeline order.
pub fn export<I>(units: I, format: CaptionFormat) -> String
where
    I: IntoIterator<Item = UnitCaptions>,
{
    create_formatter(format).format(&global_entries(units))
}

/// Seconds to a millisecond-rounded duration.
fn seconds(secs: f64) -> Duration {
    Duration::from_millis((secs.max(0.0) * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(text: &str, start: f64, end: f64) -> ChunkWindow {
        ChunkWindow {
            text: text.into(),
            start,
            end,
        }
    }

    #[test]
    fn test_offsets_accumulate_across_units() {
        let units = vec![
            UnitCaptions {
                duration: 3.0,
                windows: vec![window("a", 0.0, 1.5), window("b", 1.5, 3.0)],
            },
            UnitCaptions {
                duration: 4.0,
                windows: vec![window("c", 0.0, 4.0)],
            },
        ];

        let entries = global_entries(units);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].index, 3);
        assert_eq!(entries[2].start, Duration::from_secs(3));
        assert_eq!(entries[2].end, Duration::from_secs(7));
    }

    #[test]
    fn test_rounds_to_milliseconds() {
        assert_eq!(seconds(1.0 / 3.0), Duration::from_millis(333));
        assert_eq!(seconds(1.4999999999), Duration::from_millis(1500));
        assert_eq!(seconds(-0.1), Duration::ZERO);
    }

    #[test]
    fn test_export_from_units() {
        use crate::audio::AudioAsset;

        let unit = NarrationUnit {
            slide_name: "Ethics".into(),
            slide_index: 1,
            heading: "Intro".into(),
            heading_index: 0,
            transcript: "Intro. Ethics studies right action.".into(),
            audio: AudioAsset::new("intro.mp3", 3.0),
            used_fallback: false,
        };

        let srt = export([UnitCaptions::from_unit(&unit, 6)], CaptionFormat::Srt);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:03,000\nIntro. Ethics studies right action.\n\n"
        );
    }

    #[test]
    fn test_create_formatter_factory() {
        assert_eq!(create_formatter(CaptionFormat::Srt).extension(), "srt");
        assert_eq!(create_formatter(CaptionFormat::Vtt).extension(), "vtt");
    }
}
