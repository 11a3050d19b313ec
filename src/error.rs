use thiserror::Error;

#[derive(Error, Debug)]
pub enum LectureError {
    #[error("Outline parse failed: {0}")]
    Parse(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio asset invalid: {0}")]
    Asset(String),

    #[error("No segments survived composition; refusing to write an empty timeline")]
    EmptyTimeline,

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, LectureError>;
