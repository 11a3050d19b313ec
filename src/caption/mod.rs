//! Caption chunking.
//!
//! A transcript is split into fixed-size word groups and each group gets an
//! equal share of the narration's duration. Windows are contiguous, start at
//! zero and the last one ends exactly at the duration.

/// Words per caption chunk used by the narration pipeline.
pub const DEFAULT_WORDS_PER_CHUNK: usize = 6;

/// Text shown for a transcript with no words.
pub const PLACEHOLDER_TEXT: &str = "No content available";

/// A caption fragment with its half-open `[start, end)` interval in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkWindow {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl ChunkWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// The same window shifted onto a later clock.
    pub fn offset(&self, by: f64) -> ChunkWindow {
        ChunkWindow {
            text: self.text.clone(),
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// Lazy iterator over the windows of one transcript.
///
/// Cloning it restarts from the current position; calling [`windows`] again
/// recomputes from scratch.
#[derive(Debug, Clone)]
pub struct ChunkWindows<'a> {
    words: Vec<&'a str>,
    words_per_chunk: usize,
    duration: f64,
    count: usize,
    next: usize,
}

impl<'a> Iterator for ChunkWindows<'a> {
    type Item = ChunkWindow;

    fn next(&mut self) -> Option<ChunkWindow> {
        if self.next >= self.count {
            return None;
        }

        let i = self.next;
        self.next += 1;

        let text = if self.words.is_empty() {
            PLACEHOLDER_TEXT.to_string()
        } else {
            let from = i * self.words_per_chunk;
            let to = (from + self.words_per_chunk).min(self.words.len());
            self.words[from..to].join(" ")
        };

        let step = self.duration / self.count as f64;
        let start = i as f64 * step;
        let end = if i + 1 == self.count {
            self.duration
        } else {
            (i + 1) as f64 * step
        };

        Some(ChunkWindow { text, start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkWindows<'_> {}

/// Windows for `transcript` spread over `duration` seconds.
pub fn windows(transcript: &str, duration: f64, words_per_chunk: usize) -> ChunkWindows<'_> {
    let words: Vec<&str> = transcript.split_whitespace().collect();
    let words_per_chunk = words_per_chunk.max(1);
    let count = if words.is_empty() {
        1
    } else {
        words.len().div_ceil(words_per_chunk)
    };
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };

    ChunkWindows {
        words,
        words_per_chunk,
        duration,
        count,
        next: 0,
    }
}

/// Collected windows with a custom chunk size.
pub fn chunk_with(transcript: &str, duration: f64, words_per_chunk: usize) -> Vec<ChunkWindow> {
    windows(transcript, duration, words_per_chunk).collect()
}

/// Collected windows with the default six-word chunks.
pub fn chunk(transcript: &str, duration: f64) -> Vec<ChunkWindow> {
    chunk_with(transcript, duration, DEFAULT_WORDS_PER_CHUNK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contiguous(windows: &[ChunkWindow], duration: f64) {
        assert_eq!(windows[0].start, 0.0);
        assert_eq!(windows.last().unwrap().end, duration);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_groups_of_six_words() {
        let text = "one two three four five six seven eight nine";
        let windows = chunk(text, 3.0);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].text, "one two three four five six");
        assert_eq!(windows[1].text, "seven eight nine");
        assert_eq!(windows[0].end, 1.5);
        assert_contiguous(&windows, 3.0);
    }

    #[test]
    fn test_empty_transcript_gets_placeholder() {
        let windows = chunk("   \n ", 2.5);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, PLACEHOLDER_TEXT);
        assert_eq!((windows[0].start, windows[0].end), (0.0, 2.5));
    }

    #[test]
    fn test_last_window_absorbs_drift() {
        let text = "w ".repeat(7 * 6);
        let duration = 10.0;
        let windows = chunk(&text, duration);

        assert_eq!(windows.len(), 7);
        assert_contiguous(&windows, duration);
    }

    #[test]
    fn test_uneven_durations_stay_contiguous() {
        for duration in [0.1, 1.0 / 3.0, 4.7, 123.456] {
            let text = "alpha beta gamma delta ".repeat(11);
            let windows = chunk(&text, duration);
            assert_contiguous(&windows, duration);
        }
    }

    #[test]
    fn test_idempotent() {
        let text = "Virtue. Virtue ethics focuses on character and habit.";
        assert_eq!(chunk(text, 4.0), chunk(text, 4.0));

        let iter = windows(text, 4.0, 6);
        let restarted = iter.clone();
        assert_eq!(iter.collect::<Vec<_>>(), restarted.collect::<Vec<_>>());
    }

    #[test]
    fn test_exact_size() {
        let iter = windows("a b c d e f g", 1.0, 3);
        assert_eq!(iter.len(), 3);
    }

    #[test]
    fn test_invalid_inputs_are_clamped() {
        let windows = chunk_with("a b", -1.0, 0);
        assert_eq!(windows.len(), 2);
        assert!(windows.iter().all(|w| w.duration() == 0.0));
    }

    #[test]
    fn test_window_helpers() {
        let w = ChunkWindow {
            text: "x".into(),
            start: 1.0,
            end: 2.0,
        };
        assert!(w.contains(1.0));
        assert!(!w.contains(2.0));
        let shifted = w.offset(3.0);
        assert_eq!((shifted.start, shifted.end), (4.0, 5.0));
    }
}
