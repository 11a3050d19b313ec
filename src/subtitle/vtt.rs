// WebVTT subtitle format
use super::{SubtitleEntry, SubtitleFormatter};

pub struct VttFormatter;

impl SubtitleFormatter for VttFormatter {
    fn format(&self, entries: &[SubtitleEntry]) -> String {
        let mut output = String::from("WEBVTT\n\n");

        for entry in entries {
            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                entry.index,
                format_timestamp(entry.start),
                format_timestamp(entry.end),
                entry.text
            ));
        }

        output
    }

    fn extension(&self) -> &'static str {
        "vtt"
    }
}

fn format_timestamp(d: std::time::Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
