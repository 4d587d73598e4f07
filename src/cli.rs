use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::completions::CompletionCommands;
use crate::ui::OutputFormat;

/// Flags shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Show debug events, including ffmpeg command lines and output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Event output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Configuration file (defaults to $VIDMAKER_CONFIG, ./config.toml, then the user config dir)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Text file with one video title per line
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Generate at most this many videos
    #[arg(long)]
    pub max_titles: Option<usize>,

    /// Skip this many titles from the start of the list
    #[arg(long, default_value_t = 0)]
    pub start_index: usize,
}

#[derive(Args, Debug, Clone)]
pub struct LongArgs {
    /// Task directory containing script.txt; receives all output files
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub task_path: PathBuf,

    /// Title shown over the first seconds of the video
    #[arg(long)]
    pub title: String,

    /// Directory of video materials (defaults to <storage>/long/video_materials)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub materials: Option<PathBuf>,
}

/// Exactly one text source.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct VoiceInput {
    /// Text to speak
    #[arg(long)]
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct VoiceArgs {
    #[command(flatten)]
    pub input: VoiceInput,

    /// Voice name, e.g. zh-CN-XiaoyiNeural-Female or siliconflow:<model>:<voice>-<Gender>
    #[arg(long)]
    pub voice_name: Option<String>,

    /// Speaking rate, 0.25 to 4.0
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub voice_rate: f32,

    /// Volume, 0.6 to 5.0
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub voice_volume: f32,

    /// Output mp3 path (defaults to <file stem>.mp3 next to --file, or output.mp3)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate short videos for every title in a list
    Batch(BatchArgs),
    /// Assemble a long landscape video from a task directory
    Long(LongArgs),
    /// Convert text to speech
    Voice(VoiceArgs),
    /// Shell completion scripts
    Completions {
        #[command(subcommand)]
        command: CompletionCommands,
    },
}

/// Umbrella command bundling all tools
#[derive(Parser, Debug)]
#[command(name = "vidmaker", author, version, about, long_about = None)]
pub struct VidmakerCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}
