//! Build a reference corpus from a songs JSON dump

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::EvalError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CorpusSong {
    artist: String,
    album: String,
    #[serde(default)]
    lyrics: Option<String>,
    #[serde(default)]
    media: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaLink {
    provider: String,
    url: String,
}

/// Files written and songs skipped by an import
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// YouTube link from a `Media` field (a single-quoted JSON list)
fn youtube_url(media: &str) -> Option<String> {
    let links: Vec<MediaLink> = serde_json::from_str(&media.replace('\'', "\"")).ok()?;
    links
        .into_iter()
        .find(|l| l.provider == "youtube")
        .map(|l| l.url)
}

/// Write up to `limit` songs of `input` into `out` as reference files
pub fn import_corpus(input: &Path, out: &Path, limit: usize) -> Result<ImportSummary, EvalError> {
    let songs: Vec<CorpusSong> = serde_json::from_slice(&std::fs::read(input)?)?;
    let tags = Regex::new(r"\[.*?\]")?;
    std::fs::create_dir_all(out)?;

    let mut summary = ImportSummary::default();
    for song in songs.into_iter().take(limit) {
        let lyrics = match song.lyrics.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l,
            _ => {
                warn!(artist = %song.artist, album = %song.album, "Lyrics not found, skipping");
                summary.skipped += 1;
                continue;
            }
        };
        let Some(url) = song.media.as_deref().and_then(youtube_url) else {
            warn!(artist = %song.artist, album = %song.album, "YouTube URL not found, skipping");
            summary.skipped += 1;
            continue;
        };

        let lyrics = tags.replace_all(lyrics, "");
        let path = out.join(format!("{} - {}.txt", song.artist, song.album));
        std::fs::write(&path, format!("{}\n\n{}", url, lyrics.trim()))?;
        info!(path = ?path, "Reference saved");
        summary.written.push(path);
    }

    Ok(summary)
}
