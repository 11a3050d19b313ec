pub mod command;
pub mod google;

pub use command::CommandSynthesizer;
pub use google::GoogleTts;

use crate::audio::AudioAsset;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Text-to-speech backend.
///
/// Implementations write the audio for `text` to `dest` and return a
/// provisional asset carrying the measured duration; the caller verifies it
/// before keeping it.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<AudioAsset>;
    fn name(&self) -> &'static str;
    /// File extension of the produced audio.
    fn extension(&self) -> &'static str;
    /// Smallest plausible output size in bytes.
    fn min_output_bytes(&self) -> u64 {
        0
    }
}
