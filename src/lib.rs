pub mod audio;
pub mod caption;
pub mod compose;
pub mod config;
pub mod error;
pub mod generate;
pub mod interactive;
pub mod narration;
pub mod outline;
pub mod pipeline;
pub mod render;
pub mod subtitle;
pub mod synth;
pub mod timeline;

pub use config::Config;
pub use error::{LectureError, Result};
pub use pipeline::{
    print_summary, run_pipeline, PipelineConfig, PipelineReport, PipelineResult, PipelineStats,
};
