//! Persisted playlist file: one locator per line, verbatim in the system
//! charset, no escaping, trailing newline. Grounded on spec §6 "Persisted
//! state layout" — the teacher persists its own state with `bincode`
//! instead, so this format has no direct teacher analogue; the line-based
//! load/save shape still follows the teacher's plain `std::fs` I/O style
//! (`ompl/src/library/track/mod.rs` `find_tracks`'s direct filesystem use).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::logging::*;
use crate::track::Locator;
use crate::unicode;

/// Default playlist path: configuration directory + `lib.pl`, per spec §6.
/// No directory crate is in scope (the teacher carries none either), so
/// this follows the XDG base-directory fallback chain by hand.
pub fn default_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("lib.pl")
}

fn locator_from_line(line: &str) -> Locator {
    let lower = line.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Locator::Url(line.to_string())
    } else {
        Locator::Path(PathBuf::from(line))
    }
}

/// Parse a raw playlist file's bytes into locators, skipping empty lines
/// and `#`-prefixed comments.
pub fn parse(bytes: &[u8]) -> Vec<Locator> {
    bytes
        .split(|&b| b == b'\n')
        .map(|raw| unicode::locator_to_utf8(raw))
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| locator_from_line(&line))
        .collect()
}

/// Load a playlist file. Per spec §7, I/O errors are reported to the caller
/// and must not corrupt the in-memory index; this function performs no
/// library mutation itself, so a failed load simply returns `Err`.
pub fn load(path: &Path) -> io::Result<Vec<Locator>> {
    let bytes = fs::read(path)?;
    let locators = parse(&bytes);
    info!("Loaded {} locators from {}", locators.len(), path.display());
    Ok(locators)
}

/// Save locators as a playlist file: one line each, trailing newline.
pub fn save<'a>(path: &Path, locators: impl Iterator<Item = &'a Locator>) -> io::Result<()> {
    let mut out = String::new();
    for locator in locators {
        out.push_str(&locator.display());
        out.push('\n');
    }
    fs::write(path, out.as_bytes())?;
    info!("Saved playlist to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let text = b"/a.mp3\n\n# a comment\n/b.mp3\n";
        let locators = parse(text);
        assert_eq!(locators, vec![Locator::Path(PathBuf::from("/a.mp3")), Locator::Path(PathBuf::from("/b.mp3"))]);
    }

    #[test]
    fn parse_recognizes_http_locators() {
        let text = b"http://example.com/stream.mp3\n";
        let locators = parse(text);
        assert_eq!(locators, vec![Locator::Url("http://example.com/stream.mp3".to_string())]);
    }

    #[test]
    fn save_then_parse_round_trips() {
        let locators = vec![Locator::Path(PathBuf::from("/a.mp3")), Locator::Path(PathBuf::from("/b.mp3"))];
        let dir = std::env::temp_dir().join(format!("melodist-playlist-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lib.pl");
        save(&path, locators.iter()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, locators);
        let _ = fs::remove_dir_all(&dir);
    }
}
