use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "lyricart")]
#[command(about = "Turn a song into artwork: transcribe, analyze, prompt, paint")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_negates_reqs = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the audio file
    #[arg(required = true)]
    pub file: Option<PathBuf>,

    // Pipeline
    /// Whisper model size (tiny, base, small, medium, large, turbo)
    #[arg(long, default_value = "turbo")]
    pub model: String,

    /// Track(s) to analyze: lyrical, instrumental or hybrid
    #[arg(long, default_value = "lyrical")]
    pub mode: String,

    /// Stage to stop at (1: transcription, 2: analysis, 3: prompt, 4: image)
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(1..=4))]
    pub depth: u8,

    /// Also save the transcription to this path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Render the Mel spectrogram to this PNG (instrumental/hybrid modes)
    #[arg(long)]
    pub spectrogram: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Lyric language for sentiment model selection (en, ar, anything else = multilingual)
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// Config / credentials file (defaults to ./lyricart.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress warnings (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze a lyrics text file (sentiment + thematic analysis)
    Analyze {
        /// Lyrics file (UTF-8 or Windows-1252, plain or transcript format)
        lyrics: PathBuf,
    },

    /// Print instrumental features of an audio file as JSON
    Features {
        /// Path to the audio file
        audio: PathBuf,

        /// Render the Mel spectrogram to this PNG
        #[arg(long)]
        spectrogram: Option<PathBuf>,
    },

    /// Score transcriptions against reference lyrics (WER / CER)
    Evaluate {
        /// Folder of reference lyric files
        #[arg(long, default_value = "original_lyrics")]
        originals: PathBuf,

        /// Folder of `<song>_(<model>).txt` transcriptions
        #[arg(long, default_value = "lyric_results")]
        results: PathBuf,

        /// Models to score
        #[arg(long, value_delimiter = ',', default_value = "small,turbo,large")]
        models: Vec<String>,
    },

    /// Build a reference corpus from a songs JSON dump
    ImportCorpus {
        /// JSON array of songs (Artist, Album, Lyrics, Media)
        input: PathBuf,

        /// Output folder
        #[arg(long, default_value = "original_lyrics")]
        out: PathBuf,

        /// Maximum number of songs to read
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

impl Args {
    /// Log level implied by the verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.common.verbose {
            tracing::Level::DEBUG
        } else if self.common.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}
