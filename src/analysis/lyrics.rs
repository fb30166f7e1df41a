use std::path::Path;

use encoding_rs::WINDOWS_1252;
use tracing::warn;

use crate::error::AnalysisError;
use crate::transcribe::transcript;

/// Read a lyric file as UTF-8, falling back to Windows-1252
pub fn read_lyrics(path: &Path) -> Result<String, AnalysisError> {
    let bytes = std::fs::read(path).map_err(|source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(bytes, path)
}

/// UTF-8 first, Windows-1252 otherwise; `path` only labels errors and logs
pub fn decode(bytes: Vec<u8>, path: &Path) -> Result<String, AnalysisError> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            let bytes = e.into_bytes();
            let (text, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                return Err(AnalysisError::Encoding(path.to_path_buf()));
            }
            warn!(path = ?path, "Lyrics are not UTF-8, decoded as Windows-1252");
            Ok(text.into_owned())
        }
    }
}

/// Text to analyze; transcripts contribute their segment texts only
pub fn lyric_text(raw: &str) -> String {
    if !transcript::is_transcript(raw) {
        return raw.to_string();
    }

    match transcript::parse(raw) {
        Ok(segments) => segments
            .into_iter()
            .map(|s| s.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("Habibi, ya nour el ain\nيا بيروت".as_bytes()).unwrap();
        assert_eq!(
            read_lyrics(file.path()).unwrap(),
            "Habibi, ya nour el ain\nيا بيروت"
        );
    }

    #[test]
    fn test_falls_back_to_windows_1252() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // "café – naïve" in cp1252
        file.write_all(&[0x63, 0x61, 0x66, 0xE9, 0x20, 0x96, 0x20, 0x6E, 0x61, 0xEF, 0x76, 0x65])
            .unwrap();
        assert_eq!(read_lyrics(file.path()).unwrap(), "café \u{2013} naïve");
    }

    #[test]
    fn test_missing_file() {
        let err = read_lyrics(Path::new("/nonexistent/lyrics.txt")).unwrap_err();
        assert!(matches!(err, AnalysisError::Read { .. }));
    }

    #[test]
    fn test_transcript_text_is_stripped() {
        let raw = "[0.00 --> 2.00] first line\n[2.00 --> 4.50] second line\n";
        assert_eq!(lyric_text(raw), "first line\nsecond line");
        assert_eq!(lyric_text("plain words\n"), "plain words\n");
    }
}
