use crate::config::Config;
use crate::pipeline::PipelineReport;
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::fs;
use std::path::{Path, PathBuf};

const OUTLINE_EXTENSIONS: &[&str] = &["json", "txt", "md"];

pub fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║        lecturecast - Narrated Lecture Builder     ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

/// Ask for the Gemini key when generation needs one and none is configured.
pub fn setup_api_key(mut config: Config) -> anyhow::Result<Config> {
    if config.gemini_api_key.is_some() {
        println!("{} API key configured", style("✓").green());
        return Ok(config);
    }

    println!("{} Gemini API key not found", style("!").yellow());
    println!("  Get one at: https://aistudio.google.com/apikey\n");

    let api_key: String = Input::new()
        .with_prompt("Enter your Gemini API key")
        .interact_text()?;

    if api_key.trim().is_empty() {
        anyhow::bail!("API key is required");
    }

    config.gemini_api_key = Some(api_key.trim().to_string());

    if Confirm::new()
        .with_prompt("Save API key to config file?")
        .default(true)
        .interact()?
    {
        save_config(&config)?;
        println!("{} API key saved to config\n", style("✓").green());
    }

    Ok(config)
}

fn save_config(config: &Config) -> anyhow::Result<()> {
    if let Some(config_path) = Config::config_file_path() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_path, toml::to_string_pretty(config)?)?;
    }
    Ok(())
}

/// Pick an outline file from the current directory or enter a path.
pub fn select_outline_file() -> anyhow::Result<PathBuf> {
    println!("\n{}", style("Select outline file:").bold());

    let files = scan_outline_files(Path::new("."))?;

    let custom_path = || -> anyhow::Result<PathBuf> {
        let path: String = Input::new()
            .with_prompt("Enter outline path")
            .interact_text()?;
        let path = PathBuf::from(path.trim());
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        Ok(path)
    };

    if files.is_empty() {
        println!("  No outline files found in current directory.\n");
        return custom_path();
    }

    let mut items: Vec<String> = files
        .iter()
        .map(|f| {
            let size = fs::metadata(f)
                .map(|m| format_size(m.len()))
                .unwrap_or_else(|_| "?".to_string());
            format!("{} ({})", f.display(), size)
        })
        .collect();
    items.push("Enter custom path...".to_string());

    let selection = Select::new()
        .with_prompt("Choose a file")
        .items(&items)
        .default(0)
        .interact()?;

    if selection == files.len() {
        custom_path()
    } else {
        Ok(files[selection].clone())
    }
}

fn scan_outline_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if OUTLINE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                files.push(path);
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Ask for the base name of the output artifacts.
pub fn prompt_base_name(default: &str) -> anyhow::Result<String> {
    let name: String = Input::new()
        .with_prompt("Output file name (without extension)")
        .default(default.to_string())
        .interact_text()?;

    let name = sanitize_base_name(&name);
    if name.is_empty() {
        anyhow::bail!("Output name is required");
    }
    Ok(name)
}

/// Ask whether the narration audio should be deleted after the run.
pub fn confirm_cleanup(report: &PipelineReport) -> anyhow::Result<bool> {
    let prompt = format!(
        "Delete {} narration files in {}?",
        report.segments,
        report.audio_dir.display()
    );
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()?)
}

/// Base name suggested for an outline file.
pub fn base_name_for(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    // "<name>.outline.txt" suggests "<name>"
    let stem = stem.strip_suffix(".outline").unwrap_or(&stem);
    let name = sanitize_base_name(stem);
    if name.is_empty() {
        "lecture".to_string()
    } else {
        name
    }
}

/// Strip path separators and surrounding whitespace from a file base name.
pub fn sanitize_base_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_sanitize_base_name() {
        assert_eq!(sanitize_base_name("  ethics  "), "ethics");
        assert_eq!(sanitize_base_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_base_name(".."), "");
    }

    #[test]
    fn test_base_name_for() {
        assert_eq!(base_name_for(Path::new("/x/ethics.json")), "ethics");
        assert_eq!(base_name_for(Path::new("ethics.outline.txt")), "ethics");
        assert_eq!(base_name_for(Path::new("")), "lecture");
    }

    #[test]
    fn test_scan_outline_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.TXT"), "{}").unwrap();
        fs::write(dir.path().join("clip.mp4"), "").unwrap();
        fs::create_dir(dir.path().join("sub.json")).unwrap();

        let files = scan_outline_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.json"]);
    }
}
