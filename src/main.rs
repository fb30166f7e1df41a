mod analysis;
mod app;
mod artwork;
mod audio;
mod cli;
mod config;
mod error;
mod eval;
mod openai;
mod pipeline;
mod prompt;
mod sentiment;
mod store;
mod transcribe;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::analysis::LyricAnalyzer;
use crate::app::{RunSettings, Stage};
use crate::audio::AudioFeatureExtractor;
use crate::cli::{Args, Command};
use crate::config::Config;
use crate::error::{LyricArtError, Result};
use crate::openai::OpenAiClient;
use crate::pipeline::{PipelineOrchestrator, PipelineReport};
use crate::sentiment::{HuggingFaceClassifier, Language, SentimentClassifier};
use crate::store::{ArtifactStore, FsArtifactStore};
use crate::transcribe::transcript;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_tracing(args.log_level());

    info!("lyricart v{} starting", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_precondition() {
                error!("{} (nothing was run)", e);
            } else {
                error!("{}", e);
            }
            ExitCode::from(exit_status(&e))
        }
    }
}

/// 2 for bad input or missing credentials, 1 when a stage failed
fn exit_status(err: &LyricArtError) -> u8 {
    if err.is_precondition() {
        2
    } else {
        1
    }
}

/// Initialize tracing subscriber
fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(args: Args) -> Result<()> {
    match args.command.clone() {
        Some(Command::Analyze { lyrics }) => analyze(&args, &lyrics).await,
        Some(Command::Features { audio, spectrogram }) => {
            if !audio.is_file() {
                return Err(LyricArtError::FileNotFound(audio));
            }
            let features = AudioFeatureExtractor::default()
                .extract_file_blocking(audio, spectrogram)
                .await?;
            println!("{}", serde_json::to_string_pretty(&features)?);
            Ok(())
        }
        Some(Command::Evaluate {
            originals,
            results,
            models,
        }) => {
            let scores = eval::evaluate(&originals, &results, &models)?;
            println!("=== Error Rates ===");
            let mut previous: Option<&str> = None;
            for score in &scores {
                if previous.is_some_and(|song| song != score.song) {
                    println!();
                }
                println!("{}", score);
                previous = Some(score.song.as_str());
            }
            Ok(())
        }
        Some(Command::ImportCorpus { input, out, limit }) => {
            let summary = eval::import_corpus(&input, &out, limit)?;
            info!(
                written = summary.written.len(),
                skipped = summary.skipped,
                "Corpus import complete"
            );
            Ok(())
        }
        None => {
            let audio = args.file.clone().unwrap_or_default();
            let settings = RunSettings::from_args(audio, &args)?;
            let config = Config::load(args.common.config.as_deref())?;
            let orchestrator = orchestrator(&config, &settings, args.common.language.clone())?;

            let report = orchestrator.run(&settings).await?;
            print_report(&report, &settings);
            Ok(())
        }
    }
}

/// Wire up only the services the requested stages reach
fn orchestrator(
    config: &Config,
    settings: &RunSettings,
    language: Option<String>,
) -> Result<PipelineOrchestrator> {
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.output_dir));
    let mut orchestrator = PipelineOrchestrator::new(store)
        .with_language(language)
        .with_max_tokens(config.sentiment.max_tokens);

    let lyrics = settings.mode.uses_lyrics();
    let depth = settings.depth;

    if lyrics {
        orchestrator = orchestrator.with_transcriber(Arc::new(OpenAiClient::for_transcription(config)?));
    }
    if lyrics && depth.includes(Stage::Analysis) {
        orchestrator = orchestrator.with_classifier(Arc::new(HuggingFaceClassifier::from_config(config)?));
    }
    if (lyrics && depth.includes(Stage::Analysis)) || depth.includes(Stage::Prompt) {
        let client = Arc::new(OpenAiClient::from_config(config)?);
        orchestrator = orchestrator.with_chat(client.clone());
        if depth.includes(Stage::Image) {
            orchestrator = orchestrator.with_images(client);
        }
    }

    Ok(orchestrator)
}

async fn analyze(args: &Args, lyrics: &Path) -> Result<()> {
    if !lyrics.is_file() {
        return Err(LyricArtError::FileNotFound(lyrics.to_path_buf()));
    }

    let config = Config::load(args.common.config.as_deref())?;
    let sentiment = SentimentClassifier::new(
        Arc::new(HuggingFaceClassifier::from_config(&config)?),
        Language::from_code(args.common.language.as_deref()),
        config.sentiment.max_tokens,
    );
    let analyzer = LyricAnalyzer::new(
        sentiment,
        Arc::new(OpenAiClient::from_config(&config)?),
        Arc::new(FsArtifactStore::new(&config.output_dir)),
    );

    let outcome = analyzer.analyze(lyrics).await?;
    println!("Analysis saved to {}", outcome.handle.path.display());
    Ok(())
}

fn print_report(report: &PipelineReport, settings: &RunSettings) {
    if settings.depth.get() == 1 && settings.transcript_output.is_none() {
        for segment in &report.segments {
            println!("{}", transcript::format_segment(segment));
        }
    }

    if let Some(handle) = &report.transcript {
        println!("Transcript: {}", handle.path.display());
    }
    if let Some(analysis) = &report.analysis {
        println!("Analysis: {}", analysis.handle.path.display());
    }
    if let Some(features) = &report.features {
        println!("{}", features.describe());
    }
    if let Some(prompt) = &report.art_prompt {
        println!("Art prompt: {}", prompt.main_prompt);
    }
    if let Some(image) = &report.image {
        println!("Image: {}", image.image_path.display());
        println!("Prompt used: {}", image.prompt_used);
    }

    info!(
        song = %report.song,
        mode = %report.mode,
        depth = report.depth.get(),
        stages = report.completed.len(),
        "Pipeline finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, PromptError, TranscriptionError};

    #[test]
    fn test_exit_status_separates_preconditions() {
        assert_eq!(exit_status(&LyricArtError::UnknownMode("jazz".into())), 2);
        assert_eq!(exit_status(&LyricArtError::Prompt(PromptError::NoInputs)), 2);
        assert_eq!(
            exit_status(&LyricArtError::Config(ConfigError::MissingCredential {
                env: "OPENAI_API_KEY",
                key: "openai.api_key",
            })),
            2
        );
        assert_eq!(
            exit_status(&LyricArtError::Transcription(TranscriptionError::InvalidSegment {
                index: 0,
                reason: "bad bounds".into(),
            })),
            1
        );
    }

    #[test]
    fn test_bad_mode_is_rejected_before_any_service() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("song.mp3");
        std::fs::write(&audio, b"stub").unwrap();
        let args = Args::parse_from(["lyricart", audio.to_str().unwrap(), "--mode", "karaoke"]);

        let err = RunSettings::from_args(audio, &args).unwrap_err();
        assert_eq!(exit_status(&err), 2);
    }
}
