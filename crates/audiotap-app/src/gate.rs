//! File-type gate
//!
//! Checks the reported MIME type only. A mislabeled file gets through here
//! and fails later at decode.

use std::path::Path;

use crate::config::gate::{ALLOWED_TYPES, REJECTION_MESSAGE};
use crate::error::{AppError, Result};

/// Accept exactly the allowed MIME types
pub fn validate_mime(mime: &str) -> Result<()> {
    if ALLOWED_TYPES.contains(&mime) {
        Ok(())
    } else {
        Err(AppError::Rejected(REJECTION_MESSAGE.to_string()))
    }
}

/// MIME type a file picker would report for `path`, judged by extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "mp4" | "m4a" => Some("audio/mp4"),
        _ => None,
    }
}

/// Gate a file on disk; returns the MIME type it passed under
pub fn check_path(path: &Path) -> Result<&'static str> {
    let mime = mime_for_path(path)
        .ok_or_else(|| AppError::Rejected(REJECTION_MESSAGE.to_string()))?;
    validate_mime(mime)?;
    Ok(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_types() {
        for mime in ["audio/mpeg", "audio/wav", "audio/mp4"] {
            assert!(validate_mime(mime).is_ok(), "{} should pass", mime);
        }
    }

    #[test]
    fn rejects_everything_else() {
        for mime in ["audio/ogg", "audio/flac", "video/mp4", "text/plain", "", "AUDIO/WAV"] {
            match validate_mime(mime) {
                Err(AppError::Rejected(msg)) => {
                    assert_eq!(msg, "Please upload an MP3, WAV, or MP4 file")
                }
                other => panic!("{:?} should be rejected, got {:?}", mime, other),
            }
        }
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a.mp3")), Some("audio/mpeg"));
        assert_eq!(mime_for_path(Path::new("a.WAV")), Some("audio/wav"));
        assert_eq!(mime_for_path(Path::new("dir/a.mp4")), Some("audio/mp4"));
        assert_eq!(mime_for_path(Path::new("a.m4a")), Some("audio/mp4"));
        assert_eq!(mime_for_path(Path::new("a.ogg")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn check_path_rejects_unknown_extension() {
        assert!(matches!(check_path(Path::new("song.flac")), Err(AppError::Rejected(_))));
        assert_eq!(check_path(Path::new("song.mp3")).unwrap(), "audio/mpeg");
    }
}
