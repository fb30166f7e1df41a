use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::Args;
use crate::error::{LyricArtError, Result};
use crate::transcribe::ModelSize;

/// Which tracks of the song feed the art prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Lyrics only (transcription + lyric analysis)
    #[default]
    Lyrical,
    /// Instrumental audio features only
    Instrumental,
    /// Both tracks, run one after the other
    Hybrid,
}

impl Mode {
    pub fn uses_lyrics(&self) -> bool {
        matches!(self, Mode::Lyrical | Mode::Hybrid)
    }

    pub fn uses_instrumentals(&self) -> bool {
        matches!(self, Mode::Instrumental | Mode::Hybrid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Lyrical => "lyrical",
            Mode::Instrumental => "instrumental",
            Mode::Hybrid => "hybrid",
        }
    }
}

impl FromStr for Mode {
    type Err = LyricArtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lyrical" => Ok(Mode::Lyrical),
            "instrumental" => Ok(Mode::Instrumental),
            "hybrid" => Ok(Mode::Hybrid),
            _ => Err(LyricArtError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Transcription = 1,
    Analysis = 2,
    Prompt = 3,
    Image = 4,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Transcription,
        Stage::Analysis,
        Stage::Prompt,
        Stage::Image,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Transcription => "transcription",
            Stage::Analysis => "analysis",
            Stage::Prompt => "prompt",
            Stage::Image => "image",
        }
    }
}

/// How many stages to run; stage N runs iff N <= depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Depth(u8);

impl Depth {
    pub const MAX: Depth = Depth(4);

    pub fn new(value: u8) -> Result<Self> {
        if (1..=4).contains(&value) {
            Ok(Depth(value))
        } else {
            Err(LyricArtError::InvalidDepth(value))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Check whether a stage is inside the requested prefix
    pub fn includes(&self, stage: Stage) -> bool {
        stage as u8 <= self.0
    }

    /// Stages to execute, in order
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(move |s| self.includes(*s))
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth::MAX
    }
}

/// Validated settings for one pipeline run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub audio: PathBuf,
    pub mode: Mode,
    pub depth: Depth,
    pub model: ModelSize,
    /// Extra copy of the transcript at a caller-chosen path
    pub transcript_output: Option<PathBuf>,
    /// Where to render the Mel spectrogram, if wanted
    pub spectrogram: Option<PathBuf>,
}

impl RunSettings {
    /// Validate CLI arguments; nothing touches the filesystem beyond the existence check
    pub fn from_args(audio: PathBuf, args: &Args) -> Result<Self> {
        let mode: Mode = args.mode.parse()?;
        let model: ModelSize = args.model.parse()?;
        let depth = Depth::new(args.depth)?;

        if !audio.is_file() {
            return Err(LyricArtError::FileNotFound(audio));
        }

        Ok(Self {
            audio,
            mode,
            depth,
            model,
            transcript_output: args.output.clone(),
            spectrogram: args.spectrogram.clone(),
        })
    }

    /// Song name used to derive artifact file names
    pub fn song_name(&self) -> String {
        song_name(&self.audio)
    }
}

/// File stem of a path, or "song" when there is none
pub fn song_name(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| String::from("song"))
}
