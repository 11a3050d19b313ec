use std::path::Path;
use std::process::Command;

use hound::WavReader;
use tracing::debug;

use crate::error::{LectureError, Result};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            LectureError::Render(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(LectureError::Render("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Duration in seconds of any container ffprobe understands.
pub fn probe_duration(input: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| LectureError::Asset(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LectureError::Asset(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str.trim().parse().map_err(|e| {
        LectureError::Asset(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })
}

/// Duration in seconds read from a WAV header.
pub fn wav_duration(input: &Path) -> Result<f64> {
    let reader = WavReader::open(input)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(LectureError::Asset(format!(
            "{} reports a zero sample rate",
            input.display()
        )));
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Measure an audio file, reading WAV headers directly and probing the rest.
pub fn measure_duration(input: &Path) -> Result<f64> {
    if !input.exists() {
        return Err(LectureError::FileNotFound(input.display().to_string()));
    }

    let is_wav = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    let duration = if is_wav {
        wav_duration(input)?
    } else {
        probe_duration(input)?
    };

    debug!("Measured {}: {:.3}s", input.display(), duration);
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, samples: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_duration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 16000, 24000);

        let duration = measure_duration(&path).unwrap();
        assert!((duration - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_measure_missing_file() {
        let result = measure_duration(Path::new("/nonexistent/audio.wav"));
        assert!(matches!(result, Err(LectureError::FileNotFound(_))));
    }

    #[test]
    fn test_check_ffmpeg() {
        let available = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !available {
            eprintln!("Skipping test: FFmpeg not available or broken");
            return;
        }
        assert!(check_ffmpeg().is_ok());
    }
}
