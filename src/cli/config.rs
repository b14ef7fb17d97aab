// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};

use oggopus::Application;

/// oggopus - Ogg/Opus conversion CLI tool
#[derive(Parser, Debug)]
#[command(name = "oggopus")]
#[command(about = "Sample-accurate Ogg/Opus to WAV conversion and inspection", long_about = None)]
#[command(version)]
#[command(author = "xwsjjctz <xwsjjctz@icloud.com>")]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode Ogg/Opus file(s) to 32-bit float WAV
    Decode {
        /// Ogg/Opus file path(s)
        #[arg(value_name = "FILE")]
        files: Vec<String>,

        /// Output path (single input only; defaults to FILE with .wav extension)
        #[arg(short, long)]
        output: Option<String>,

        /// Decode at this rate instead of the one stored in the header
        #[arg(short, long)]
        rate: Option<u32>,

        /// Ignore the output gain stored in the header
        #[arg(long)]
        no_gain: bool,

        /// Bytes read per step
        #[arg(long, default_value_t = oggopus::ingest::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Encode WAV file(s) as Ogg/Opus
    Encode {
        /// WAV file path(s)
        #[arg(value_name = "FILE")]
        files: Vec<String>,

        /// Output path (single input only; defaults to FILE with .opus extension)
        #[arg(short, long)]
        output: Option<String>,

        /// Target bitrate in bits per second
        #[arg(short, long)]
        bitrate: Option<i32>,

        /// Encoder application
        #[arg(short, long, value_enum, default_value = "audio")]
        application: ApplicationArg,

        /// Comment to store, as FIELD=value (repeatable)
        #[arg(short, long = "comment", value_name = "FIELD=VALUE")]
        comments: Vec<String>,
    },

    /// Show stream information
    Info {
        /// Ogg/Opus file path(s)
        #[arg(value_name = "FILE")]
        files: Vec<String>,

        /// Include comments and embedded pictures
        #[arg(short, long)]
        detailed: bool,
    },

    /// Batch process multiple files
    Batch {
        /// Directory path
        #[arg(short, long)]
        directory: String,

        /// File pattern (e.g., "*.opus", "*.wav")
        #[arg(short, long)]
        pattern: String,

        /// Operation: decode, encode or info
        #[arg(value_enum)]
        operation: BatchOperation,
    },
}

/// Batch operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchOperation {
    Decode,
    Encode,
    Info,
}

impl std::fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchOperation::Decode => write!(f, "decode"),
            BatchOperation::Encode => write!(f, "encode"),
            BatchOperation::Info => write!(f, "info"),
        }
    }
}

/// Encoder application as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ApplicationArg {
    Voip,
    Audio,
    LowDelay,
}

impl From<ApplicationArg> for Application {
    fn from(arg: ApplicationArg) -> Self {
        match arg {
            ApplicationArg::Voip => Application::Voip,
            ApplicationArg::Audio => Application::Audio,
            ApplicationArg::LowDelay => Application::LowDelay,
        }
    }
}
