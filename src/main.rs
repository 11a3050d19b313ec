use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use lecturecast::config::{CaptionFormat, Config, TranscriptPolicy};
use lecturecast::generate::{GeminiGenerator, Mode, OutlineGenerator};
use lecturecast::interactive;
use lecturecast::pipeline::{print_summary, run_pipeline, PipelineConfig};
use lecturecast::synth::{CommandSynthesizer, GoogleTts, Synthesizer};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "lecturecast")]
#[command(version, about = "Narrated slide videos from lecture outlines")]
#[command(long_about = "Turn a slide/heading outline into a narrated video with highlighted headings and time-aligned captions. The outline can be read from a file or generated with Google Gemini.")]
struct Cli {
    /// Outline file (JSON, or text containing one JSON/literal block)
    input: Option<PathBuf>,

    /// Generate the lecture text from this query instead of reading a file
    #[arg(short, long, conflicts_with = "input")]
    generate: Option<String>,

    /// Generation mode: pdf, audio, video, text (only text builds a video)
    #[arg(short, long, default_value = "text")]
    mode: String,

    /// Text file with source material the generated lecture must stick to
    #[arg(long, requires = "generate")]
    context: Option<PathBuf>,

    /// Base name of the output files
    #[arg(short, long)]
    name: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Caption format: srt, vtt
    #[arg(long)]
    captions: Option<String>,

    /// Transcript policy: with-heading, content-only
    #[arg(long)]
    transcript: Option<String>,

    /// Speech engine: google, espeak
    #[arg(short, long, default_value = "google")]
    engine: String,

    /// Voice language code (e.g., en, fr)
    #[arg(short, long)]
    language: Option<String>,

    /// Directory for narration audio (defaults to <output-dir>/<name>_audio)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Delete narration audio after the run without asking
    #[arg(long, conflicts_with = "keep_audio")]
    cleanup: bool,

    /// Keep narration audio after the run without asking
    #[arg(long)]
    keep_audio: bool,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Write captions and print the encoder command without encoding
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if std::env::var_os("RUST_LOG").is_some() {
        builder.with_env_filter(EnvFilter::from_default_env()).init();
    } else {
        builder.with_max_level(level).init();
    }
}

fn create_synthesizer(engine: &str, config: &Config) -> Result<Box<dyn Synthesizer>> {
    let language = config.voice_language.as_str();
    match engine.to_lowercase().as_str() {
        "google" | "gtts" => Ok(Box::new(
            GoogleTts::new(language).with_base_url(config.tts_base_url.as_str()),
        )),
        "espeak" | "espeak-ng" => Ok(Box::new(CommandSynthesizer::new(language))),
        other => anyhow::bail!("Unknown engine: {}. Use 'google' or 'espeak'", other),
    }
}

fn name_from_query(query: &str) -> String {
    let words: Vec<&str> = query.split_whitespace().take(5).collect();
    let name = interactive::sanitize_base_name(&words.join("_"));
    if name.is_empty() {
        "lecture".to_string()
    } else {
        name
    }
}

fn resolve_name(cli_name: Option<&str>, default: String, interactive: bool) -> Result<String> {
    match cli_name {
        Some(name) => {
            let name = interactive::sanitize_base_name(name);
            if name.is_empty() {
                anyhow::bail!("Output name is empty");
            }
            Ok(name)
        }
        None if interactive => interactive::prompt_base_name(&default),
        None => Ok(default),
    }
}

enum Generated {
    /// Outline text to assemble, with the output base name.
    Outline { name: String, text: String },
    /// Plain lecture text that was saved and printed.
    Text,
}

async fn generate_outline(
    cli: &Cli,
    config: Config,
    output_dir: &Path,
    interactive: bool,
) -> Result<Option<Generated>> {
    let Some(ref query) = cli.generate else {
        return Ok(None);
    };

    let mode: Mode = cli.mode.parse()?;

    let config = if config.gemini_api_key.is_none() && interactive {
        interactive::setup_api_key(config)?
    } else {
        config
    };
    config
        .validate_generation()
        .context("Configuration validation failed")?;

    let context = match cli.context {
        Some(ref path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file {}", path.display()))?,
        ),
        None => None,
    };

    let name = resolve_name(cli.name.as_deref(), name_from_query(query), interactive)?;

    let api_key = config.gemini_api_key.clone().unwrap_or_default();
    let generator = GeminiGenerator::new(api_key).with_model(config.gemini_model.clone());
    let text = generator
        .generate(mode, query, context.as_deref())
        .await
        .context("Lecture generation failed")?;

    std::fs::create_dir_all(output_dir)?;
    let saved = if mode.produces_outline() {
        output_dir.join(format!("{}.outline.txt", name))
    } else {
        output_dir.join(format!("{}.{}.txt", name, mode))
    };
    std::fs::write(&saved, &text)?;
    info!("Saved generated {} text to {}", mode, saved.display());

    if !mode.produces_outline() {
        println!("{}", text);
        return Ok(Some(Generated::Text));
    }

    Ok(Some(Generated::Outline { name, text }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let interactive = Term::stdout().is_term() && Term::stderr().is_term();

    // Load and validate configuration
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(ref dir) = cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(ref lang) = cli.language {
        config.voice_language = lang.clone();
    }
    if let Some(ref format) = cli.captions {
        config.caption_format = format
            .parse::<CaptionFormat>()
            .map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(ref policy) = cli.transcript {
        config.transcript_policy = policy
            .parse::<TranscriptPolicy>()
            .map_err(|e: String| anyhow::anyhow!(e))?;
    }
    config.validate().context("Configuration validation failed")?;

    let output_dir = config.output_dir.clone();

    let (name, outline_text) =
        match generate_outline(&cli, config.clone(), &output_dir, interactive).await? {
            Some(Generated::Text) => return Ok(()),
            Some(Generated::Outline { name, text }) => (name, text),
            None => {
                if interactive && cli.input.is_none() {
                    interactive::print_header();
                }
                let input = match cli.input {
                    Some(ref path) => path.clone(),
                    None if interactive => interactive::select_outline_file()?,
                    None => anyhow::bail!("No outline given. Pass a file or use --generate"),
                };
                if !input.exists() {
                    anyhow::bail!("Outline file not found: {}", input.display());
                }
                let text = std::fs::read_to_string(&input)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                let name = resolve_name(
                    cli.name.as_deref(),
                    interactive::base_name_for(&input),
                    interactive,
                )?;
                (name, text)
            }
        };

    let synthesizer = create_synthesizer(&cli.engine, &config)?;

    let mut pipeline_config = PipelineConfig::from_config(&config, name);
    pipeline_config.work_dir = cli.work_dir.clone();
    pipeline_config.show_progress = !cli.no_progress && interactive;
    pipeline_config.dry_run = cli.dry_run;

    info!("Output:   {}", pipeline_config.video_path().display());
    info!("Captions: {}", pipeline_config.caption_format);
    info!("Engine:   {}", synthesizer.name());
    info!("Language: {}", config.voice_language);

    let result = run_pipeline(&outline_text, synthesizer, &pipeline_config).await?;
    print_summary(&result.report);

    let delete_audio = if cli.cleanup {
        true
    } else if cli.keep_audio || !interactive {
        false
    } else {
        interactive::confirm_cleanup(&result.report).unwrap_or_else(|e| {
            warn!("Cleanup prompt failed ({}), keeping audio", e);
            false
        })
    };

    let report = result.finish(delete_audio);
    if !delete_audio {
        info!("Narration audio kept in {}", report.audio_dir.display());
    }

    Ok(())
}
