use crate::participant::Personality;
use crate::render::ViewMode;
use crate::session::Mode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ai-to-ai-chat")]
#[command(version)]
#[command(about = "Watch two language models talk to each other, turn by turn")]
pub struct Args {
    /// Completion proxy URL (POST {model, messages}, answers with an SSE stream)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// models.json catalog of model ids and display names
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Model id for participant 1
    #[arg(long)]
    pub model1: Option<String>,

    /// Model id for participant 2
    #[arg(long)]
    pub model2: Option<String>,

    /// Display colour for participant 1 (#rrggbb)
    #[arg(long)]
    pub color1: Option<String>,

    /// Display colour for participant 2 (#rrggbb)
    #[arg(long)]
    pub color2: Option<String>,

    /// Personality profile for participant 1
    #[arg(long, value_enum)]
    pub personality1: Option<Personality>,

    /// Personality profile for participant 2
    #[arg(long, value_enum)]
    pub personality2: Option<Personality>,

    /// Optional conversation topic
    #[arg(long, short)]
    pub topic: Option<String>,

    /// Turn cadence: auto advances on a timer, manual waits for Enter
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Transcript layout
    #[arg(long, value_enum)]
    pub view: Option<ViewMode>,

    /// Delay before an automatic turn, in milliseconds
    #[arg(long)]
    pub auto_delay_ms: Option<u64>,

    /// Run without the interactive console and print the transcript
    #[arg(long)]
    pub headless: bool,

    /// Number of turns to run in headless mode, counting the opener
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..))]
    pub turns: u32,

    /// Write the transcript here on exit
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short)]
    pub verbose: bool,
}
