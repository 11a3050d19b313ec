use crate::caption::ChunkWindow;
use crate::compose::Segment;
use crate::error::{LectureError, Result};
use tracing::{debug, info, warn};

/// Tolerance for comparing accumulated durations.
pub const DURATION_EPSILON: f64 = 1e-6;

/// Ordered segments played back to back with their audio concatenated.
#[derive(Debug)]
pub struct Timeline {
    segments: Vec<Segment>,
    offsets: Vec<f64>,
    duration: f64,
}

/// A segment's position on the global clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl Timeline {
    /// Concatenate segments in the given order. No reordering, no gaps.
    pub fn assemble(segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(LectureError::EmptyTimeline);
        }

        let mut offsets = Vec::with_capacity(segments.len());
        let mut cursor = 0.0;
        for segment in &segments {
            offsets.push(cursor);
            cursor += segment.duration();
        }

        info!(
            "Assembled timeline: {} segments, {:.2}s",
            segments.len(),
            cursor
        );

        Ok(Self {
            segments,
            offsets,
            duration: cursor,
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn placements(&self) -> impl Iterator<Item = Placement> + '_ {
        self.segments
            .iter()
            .zip(&self.offsets)
            .enumerate()
            .map(|(index, (segment, &start))| Placement {
                index,
                start,
                end: start + segment.duration(),
            })
    }

    /// Caption windows shifted onto the global clock.
    pub fn global_captions(&self) -> Vec<ChunkWindow> {
        self.segments
            .iter()
            .zip(&self.offsets)
            .flat_map(|(segment, &offset)| segment.captions().map(move |w| w.offset(offset)))
            .collect()
    }

    /// Segment playing at global time `t`.
    pub fn segment_at(&self, t: f64) -> Option<&Segment> {
        self.placements()
            .find(|p| t >= p.start && t < p.end)
            .map(|p| &self.segments[p.index])
    }

    /// Release every segment's audio exactly once, optionally deleting the
    /// files. Returns the number of files removed.
    pub fn release(self, delete_files: bool) -> usize {
        let mut removed = 0;
        for segment in self.segments {
            let path = segment.audio().path().to_path_buf();
            match segment.into_audio().release(delete_files) {
                Ok(true) => {
                    debug!("Deleted {}", path.display());
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => warn!("Could not delete {}: {}", path.display(), e),
            }
        }
        removed
    }
}
