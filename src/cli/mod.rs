use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reelfluent",
    about = "ReelFluent - split media into clips and practice transcribing them",
    version,
    long_about = "A CLI for language learners: load a video/audio file, a direct URL, or a YouTube URL, split it into time-boxed clips, and transcribe, translate, and check your own transcription per clip using AWS. Curated clips are saved to a bounded local session."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preview the clip segmentation for a media input or a plain duration
    Clips {
        /// Media file, URL, or a plain duration in seconds
        #[arg(value_name = "INPUT")]
        input: String,

        /// Segment length in seconds (defaults to the configured length)
        #[arg(short, long, value_name = "SECONDS")]
        segment_length: Option<f64>,

        /// Source language stamped onto each clip
        #[arg(short, long, default_value = "english")]
        language: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ListFormat,
    },

    /// Transcribe a clip (or all) of a media input
    Transcribe {
        /// Media file or URL to transcribe
        #[arg(value_name = "INPUT")]
        input: String,

        /// 1-based auto-clip number to transcribe
        #[arg(short, long, value_name = "N", conflicts_with_all = ["start", "end"])]
        clip: Option<usize>,

        /// Custom range start in seconds (requires --end)
        #[arg(long, value_name = "SECONDS", requires = "end")]
        start: Option<f64>,

        /// Custom range end in seconds (requires --start)
        #[arg(long, value_name = "SECONDS", requires = "start")]
        end: Option<f64>,

        /// Segment length used to compute auto-clip ranges
        #[arg(short, long, value_name = "SECONDS")]
        segment_length: Option<f64>,

        /// Language code for transcription (auto-detect if not specified)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Include timestamps in text output
        #[arg(long)]
        timestamps: bool,

        /// Save the extracted clip audio next to the transcript
        #[arg(long)]
        save_audio: bool,
    },

    /// Translate text between languages
    Translate {
        /// Text to translate
        #[arg(value_name = "TEXT")]
        text: String,

        /// Source language (name or tag; auto-detect by default)
        #[arg(long, default_value = "auto")]
        from: String,

        /// Target language (name or tag)
        #[arg(long)]
        to: String,
    },

    /// Compare your transcription attempt against the automated one
    Compare {
        /// Your transcription attempt
        #[arg(value_name = "YOURS")]
        user: String,

        /// The automated transcription to check against
        #[arg(value_name = "REFERENCE")]
        automated: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ListFormat,
    },

    /// Download the audio track of a YouTube video (30 minute cap)
    Download {
        /// YouTube URL
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (derived from the video title if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Manage the saved session of media sources and curated clips
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Report availability of the external tools the extractors rely on
    Doctor,

    /// Configure AWS credentials and settings
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Probe a media input and register it as a session source (max 3)
    AddSource {
        /// Media file or URL
        #[arg(value_name = "INPUT")]
        input: String,

        /// Source language for the media
        #[arg(short, long, default_value = "english")]
        language: String,
    },

    /// Save a clip of a registered source to the session (30 minute cap)
    Add {
        /// Id of a registered media source
        #[arg(value_name = "SOURCE_ID")]
        source_id: String,

        /// Clip start in seconds
        #[arg(long, value_name = "SECONDS")]
        start: f64,

        /// Clip end in seconds
        #[arg(long, value_name = "SECONDS")]
        end: f64,

        /// Display name for the saved clip
        #[arg(short, long)]
        name: Option<String>,

        /// 1-based auto-clip number this range came from
        #[arg(long, value_name = "N")]
        clip_number: Option<u32>,
    },

    /// List session sources and saved clips
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ListFormat,
    },

    /// Delete a saved clip by id
    Remove {
        #[arg(value_name = "CLIP_ID")]
        clip_id: String,
    },

    /// Remove a media source and every clip saved from it
    DropSource {
        #[arg(value_name = "SOURCE_ID")]
        source_id: String,
    },
}

/// Formats for listings that carry no subtitle timing
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ListFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
