//! Segment composition.
//!
//! A segment is one narration unit rendered as a stack of layers over a
//! fixed canvas: background, slide title, the slide's heading list with the
//! narrated heading highlighted, and timed caption chunks. Every layer is
//! bounded by the unit's audio duration.

use crate::audio::AudioAsset;
use crate::caption::{self, ChunkWindow};
use crate::error::{LectureError, Result};
use crate::narration::NarrationUnit;
use tracing::{debug, warn};

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const LIGHT_GRAY: Rgb = Rgb(211, 211, 211);

    /// `0xRRGGBB`, the form ffmpeg color options accept.
    pub fn hex(&self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: u32,
    pub color: Rgb,
    pub bold: bool,
}

/// Emphasis of a heading layer. Only styling differs between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightState {
    Highlighted,
    Normal,
}

/// Visual layout and styling for every segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub width: u32,
    pub height: u32,
    pub background: Rgb,
    pub border: Rgb,
    pub border_inset: u32,
    pub title: TextStyle,
    pub title_y: u32,
    pub heading_normal: TextStyle,
    pub heading_highlighted: TextStyle,
    pub headings_y: u32,
    pub heading_spacing: u32,
    pub caption: TextStyle,
    pub caption_y: u32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background: Rgb(20, 20, 40),
            border: Rgb(40, 40, 60),
            border_inset: 10,
            title: TextStyle {
                font_size: 40,
                color: Rgb::WHITE,
                bold: true,
            },
            title_y: 50,
            heading_normal: TextStyle {
                font_size: 32,
                color: Rgb::LIGHT_GRAY,
                bold: false,
            },
            heading_highlighted: TextStyle {
                font_size: 36,
                color: Rgb::YELLOW,
                bold: true,
            },
            headings_y: 130,
            heading_spacing: 60,
            caption: TextStyle {
                font_size: 28,
                color: Rgb::YELLOW,
                bold: true,
            },
            caption_y: 550,
        }
    }
}

impl Theme {
    /// The default layout scaled to another canvas height.
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let base = Self::default();
        let scale = height as f64 / base.height as f64;
        let px = |v: u32| ((v as f64) * scale).round().max(1.0) as u32;
        let style = |s: TextStyle| TextStyle {
            font_size: px(s.font_size),
            ..s
        };

        Self {
            width,
            height,
            border_inset: px(base.border_inset),
            title: style(base.title),
            title_y: px(base.title_y),
            heading_normal: style(base.heading_normal),
            heading_highlighted: style(base.heading_highlighted),
            headings_y: px(base.headings_y),
            heading_spacing: px(base.heading_spacing),
            caption: style(base.caption),
            caption_y: px(base.caption_y),
            ..base
        }
    }

    /// Vertical position of heading `index` out of `count`. Spacing shrinks
    /// when the list would otherwise run into the caption band.
    pub fn heading_y(&self, index: usize, count: usize) -> u32 {
        let mut spacing = self.heading_spacing;
        if count > 1 {
            let room = self
                .caption_y
                .saturating_sub(self.headings_y + self.heading_highlighted.font_size);
            spacing = spacing.min(room / (count as u32 - 1));
        }
        self.headings_y + index as u32 * spacing
    }

    pub fn heading_style(&self, state: HighlightState) -> TextStyle {
        match state {
            HighlightState::Highlighted => self.heading_highlighted,
            HighlightState::Normal => self.heading_normal,
        }
    }
}

/// One visual element of a segment, in z-order.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Background {
        color: Rgb,
        border: Rgb,
        inset: u32,
    },
    Title {
        text: String,
        style: TextStyle,
        y: u32,
    },
    Heading {
        text: String,
        index: usize,
        state: HighlightState,
        style: TextStyle,
        y: u32,
    },
    /// Visible only during its window, on the segment's local clock.
    Caption {
        window: ChunkWindow,
        style: TextStyle,
        y: u32,
    },
}

impl Layer {
    /// Local `[start, end)` visibility interval within a segment.
    pub fn visibility(&self, segment_duration: f64) -> (f64, f64) {
        match self {
            Layer::Caption { window, .. } => (
                window.start.min(segment_duration),
                window.end.min(segment_duration),
            ),
            _ => (0.0, segment_duration),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Layer::Background { .. } => None,
            Layer::Title { text, .. } | Layer::Heading { text, .. } => Some(text),
            Layer::Caption { window, .. } => Some(&window.text),
        }
    }

    pub fn style(&self) -> Option<&TextStyle> {
        match self {
            Layer::Background { .. } => None,
            Layer::Title { style, .. }
            | Layer::Heading { style, .. }
            | Layer::Caption { style, .. } => Some(style),
        }
    }
}

/// A composed, audio-bound clip for one narration unit.
#[derive(Debug)]
pub struct Segment {
    pub slide_name: String,
    pub heading: String,
    pub transcript: String,
    layers: Vec<Layer>,
    audio: AudioAsset,
}

impl Segment {
    /// Always the attached audio's duration.
    pub fn duration(&self) -> f64 {
        self.audio.duration()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn audio(&self) -> &AudioAsset {
        &self.audio
    }

    pub fn into_audio(self) -> AudioAsset {
        self.audio
    }

    /// Caption windows on the segment's local clock.
    pub fn captions(&self) -> impl Iterator<Item = &ChunkWindow> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Caption { window, .. } => Some(window),
            _ => None,
        })
    }

    pub fn highlighted_heading(&self) -> Option<usize> {
        self.layers.iter().find_map(|l| match l {
            Layer::Heading {
                index,
                state: HighlightState::Highlighted,
                ..
            } => Some(*index),
            _ => None,
        })
    }
}

/// Builds segments from narration units.
#[derive(Debug, Clone)]
pub struct SegmentComposer {
    theme: Theme,
    words_per_caption: usize,
}

impl Default for SegmentComposer {
    fn default() -> Self {
        Self::new(Theme::default(), caption::DEFAULT_WORDS_PER_CHUNK)
    }
}

impl SegmentComposer {
    pub fn new(theme: Theme, words_per_caption: usize) -> Self {
        Self {
            theme,
            words_per_caption,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn words_per_caption(&self) -> usize {
        self.words_per_caption
    }

    /// Compose `unit` into a segment showing `headings` with the heading at
    /// `highlight_index` emphasised.
    ///
    /// Fails with [`LectureError::Asset`] when the unit's audio is missing or
    /// has no positive duration; the unit (and its audio) is released.
    pub fn compose(
        &self,
        unit: NarrationUnit,
        headings: &[String],
        highlight_index: usize,
    ) -> Result<Segment> {
        unit.audio.verify().map_err(|e| match e {
            LectureError::Asset(_) => e,
            other => LectureError::Asset(other.to_string()),
        })?;

        let duration = unit.duration();
        if highlight_index >= headings.len() {
            warn!(
                "Highlight index {} out of range for '{}' ({} headings)",
                highlight_index,
                unit.slide_name,
                headings.len()
            );
        }

        let theme = &self.theme;
        let mut layers = Vec::with_capacity(2 + headings.len());

        layers.push(Layer::Background {
            color: theme.background,
            border: theme.border,
            inset: theme.border_inset,
        });

        layers.push(Layer::Title {
            text: unit.slide_name.clone(),
            style: theme.title,
            y: theme.title_y,
        });

        for (index, text) in headings.iter().enumerate() {
            let state = if index == highlight_index {
                HighlightState::Highlighted
            } else {
                HighlightState::Normal
            };
            layers.push(Layer::Heading {
                text: text.clone(),
                index,
                state,
                style: theme.heading_style(state),
                y: theme.heading_y(index, headings.len()),
            });
        }

        for window in caption::windows(&unit.transcript, duration, self.words_per_caption) {
            layers.push(Layer::Caption {
                window,
                style: theme.caption,
                y: theme.caption_y,
            });
        }

        debug!(
            "Composed '{}' / '{}': {} layers over {:.2}s",
            unit.slide_name,
            unit.heading,
            layers.len(),
            duration
        );

        Ok(Segment {
            slide_name: unit.slide_name,
            heading: unit.heading,
            transcript: unit.transcript,
            layers,
            audio: unit.audio,
        })
    }
}
