//! Track metadata record: an immutable-after-construction, reference counted
//! descriptor of one track. Grounded on spec §3/§4.2 and
//! `ompl/src/library/track/mod.rs` (the teacher's own `Track`, including its
//! ID3 tag table which this module reuses for comment-key normalization).

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::SystemTime;

use crate::unicode;

pub mod id3tags;

/// A comment-name (lowercase ASCII) to value multimap, flattened to a list
/// so repeated tags are preserved in first-seen order.
pub type Comments = Vec<(String, String)>;

/// The source locator for a track: a filesystem path or a stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Path(PathBuf),
    Url(String),
}

impl Locator {
    /// Whether this locator is an HTTP(S) stream.
    pub fn is_http(&self) -> bool {
        match self {
            Locator::Url(u) => {
                let lower = u.to_ascii_lowercase();
                lower.starts_with("http://") || lower.starts_with("https://")
            }
            Locator::Path(_) => false,
        }
    }

    /// UTF-8 display form, transcoding from the system charset when needed.
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Locator::Path(p) => p.to_string_lossy(),
            Locator::Url(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Basename, used as a title fallback.
    pub fn basename(&self) -> Option<String> {
        match self {
            Locator::Path(p) => p.file_stem().map(|s| s.to_string_lossy().into_owned()),
            Locator::Url(s) => s.rsplit('/').next().map(|s| s.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Fields {
    artist: Option<String>,
    album: Option<String>,
    title: Option<String>,
    album_artist: Option<String>,
    genre: Option<String>,
    comment: Option<String>,
    media: Option<String>,
    codec: Option<String>,
    codec_profile: Option<String>,
}

#[derive(Debug, Default, Clone)]
struct IntFields {
    track_number: Option<i64>,
    disc_number: Option<i64>,
    total_discs: Option<i64>,
    date: Option<i64>,
    original_date: Option<i64>,
    duration: Option<i64>,
    bitrate: Option<i64>,
    bpm: Option<i64>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ReplayGain {
    track_gain: Option<f64>,
    album_gain: Option<f64>,
    track_peak: Option<f64>,
    album_peak: Option<f64>,
}

/// Case-folded, diacritic-stripped collation keys used for sorting and
/// equality-insensitive comparison.
#[derive(Debug, Default, Clone)]
pub struct CollationKeys {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub album_artist: String,
}

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Immutable-after-attach track descriptor. Shared via `Arc`; the only field
/// mutated after attachment is `play_count`, updated under the library lock.
#[derive(Debug)]
pub struct Track {
    uid: u64,
    locator: Locator,
    comments: Comments,
    fields: Fields,
    ints: IntFields,
    replaygain: ReplayGain,
    output_gain: Option<f64>,
    mtime: Option<SystemTime>,
    collation: CollationKeys,
    compilation: bool,
    play_count: AtomicU32,
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}
impl Eq for Track {}

impl Track {
    /// Create a new record with a fresh unique id. `attach_comments` must be
    /// called before sharing the record to populate derived fields.
    pub fn new(locator: Locator) -> Self {
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            locator,
            comments: Comments::new(),
            fields: Fields::default(),
            ints: IntFields::default(),
            replaygain: ReplayGain::default(),
            output_gain: None,
            mtime: None,
            collation: CollationKeys::default(),
            compilation: false,
            play_count: AtomicU32::new(0),
        }
    }

    /// Populate derived fields from a parsed comment multimap. Raw ID3v2
    /// frame ids are mapped to human comment keys and numeric ID3v1 genres
    /// are resolved to names before anything else looks at the multimap.
    pub fn attach_comments(&mut self, comments: Comments) {
        self.comments = comments
            .into_iter()
            .map(|(k, v)| {
                let key = id3tags::normalize_key(&k);
                if key == "genre" {
                    (key, id3tags::resolve_genre(&v))
                } else {
                    (key, v)
                }
            })
            .collect();

        let has_any_tag = !self.comments.is_empty();

        self.fields.artist = self.comments_first("artist").map(String::from);
        self.fields.album = self.comments_first("album").map(String::from);
        self.fields.genre = self.comments_first("genre").map(String::from);
        self.fields.media = self.comments_first("media").map(String::from);
        self.fields.comment = self.comments_first("comment").map(String::from);
        self.fields.album_artist = self
            .comments_first("albumartist")
            .map(String::from)
            .or_else(|| self.fields.artist.clone());
        self.fields.title = self
            .comments_first("title")
            .map(String::from)
            .or_else(|| if has_any_tag { self.locator.basename() } else { None });

        self.ints.track_number = self.comments_first("tracknumber").and_then(parse_leading_int);
        self.ints.disc_number = self.comments_first("discnumber").and_then(parse_leading_int);
        self.ints.total_discs = self
            .comments_first("totaldiscs")
            .or_else(|| self.comments_first("disctotal"))
            .and_then(parse_leading_int);
        self.ints.date = self.comments_first("date").and_then(parse_date_yyyymmdd);
        self.ints.original_date = self
            .comments_first("originaldate")
            .and_then(parse_date_yyyymmdd);
        self.ints.bpm = self.comments_first("bpm").and_then(parse_leading_int);

        self.replaygain = ReplayGain {
            track_gain: self
                .comments_first("replaygain_track_gain")
                .and_then(parse_gain_float)
                .or_else(|| self.comments_first("r128_track_gain").and_then(parse_leading_int).map(r128_to_gain)),
            album_gain: self
                .comments_first("replaygain_album_gain")
                .and_then(parse_gain_float)
                .or_else(|| self.comments_first("r128_album_gain").and_then(parse_leading_int).map(r128_to_gain)),
            track_peak: self.comments_first("replaygain_track_peak").and_then(parse_gain_float),
            album_peak: self.comments_first("replaygain_album_peak").and_then(parse_gain_float),
        };

        self.compilation = self
            .comments_first("compilation")
            .map(is_truthy)
            .unwrap_or(false);

        self.collation = CollationKeys {
            artist: unicode::collate_key(self.fields.artist.as_deref().unwrap_or("")),
            album: unicode::collate_key(self.fields.album.as_deref().unwrap_or("")),
            title: unicode::collate_key(self.fields.title.as_deref().unwrap_or("")),
            album_artist: unicode::collate_key(self.fields.album_artist.as_deref().unwrap_or("")),
        };
    }

    /// Decoder-supplied duration in seconds. Reading audio isn't part of the
    /// core; callers (the scanner collaborator) set this after probing.
    pub fn set_duration(&mut self, seconds: i64) {
        self.ints.duration = Some(seconds);
    }

    /// Decoder-supplied bitrate in bits/sec.
    pub fn set_bitrate(&mut self, bits_per_sec: i64) {
        self.ints.bitrate = Some(bits_per_sec);
    }

    /// Decoder-supplied codec identifiers.
    pub fn set_codec(&mut self, codec: impl Into<String>, profile: Option<String>) {
        self.fields.codec = Some(codec.into());
        self.fields.codec_profile = profile;
    }

    pub fn set_mtime(&mut self, mtime: SystemTime) {
        self.mtime = Some(mtime);
    }

    pub fn set_output_gain(&mut self, gain: f64) {
        self.output_gain = Some(gain);
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn collation(&self) -> &CollationKeys {
        &self.collation
    }

    pub fn compilation(&self) -> bool {
        self.compilation
    }

    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    pub fn output_gain(&self) -> Option<f64> {
        self.output_gain
    }

    pub fn replaygain_track_gain(&self) -> Option<f64> {
        self.replaygain.track_gain
    }
    pub fn replaygain_album_gain(&self) -> Option<f64> {
        self.replaygain.album_gain
    }
    pub fn replaygain_track_peak(&self) -> Option<f64> {
        self.replaygain.track_peak
    }
    pub fn replaygain_album_peak(&self) -> Option<f64> {
        self.replaygain.album_peak
    }

    pub fn track_number(&self) -> Option<i64> {
        self.ints.track_number
    }
    pub fn disc_number(&self) -> Option<i64> {
        self.ints.disc_number
    }
    pub fn total_discs(&self) -> Option<i64> {
        self.ints.total_discs
    }

    pub fn artist(&self) -> Option<&str> {
        self.fields.artist.as_deref()
    }
    pub fn album(&self) -> Option<&str> {
        self.fields.album.as_deref()
    }
    pub fn title(&self) -> Option<&str> {
        self.fields.title.as_deref()
    }
    pub fn album_artist(&self) -> Option<&str> {
        self.fields.album_artist.as_deref()
    }

    /// Current play count. Mutated only under the library lock.
    pub fn play_count(&self) -> u32 {
        self.play_count.load(Ordering::Relaxed)
    }

    /// Bump play count by one. Caller must hold the library lock.
    pub fn increment_play_count(&self) {
        self.play_count.fetch_add(1, Ordering::Relaxed);
    }

    /// First occurrence of `key` in the comment multimap.
    pub fn comments_first(&self, key: &str) -> Option<&str> {
        self.comments.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// All occurrences of `key`, in insertion order.
    pub fn comments_all(&self, key: &str) -> Vec<&str> {
        self.comments.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }

    /// Fetch a builtin or user-defined string field by filter key.
    pub fn field_string(&self, key: &str) -> Option<String> {
        match key {
            "filename" => Some(self.locator.display().into_owned()),
            "codec" => self.fields.codec.clone(),
            "codec_profile" => self.fields.codec_profile.clone(),
            "artist" => self.fields.artist.clone(),
            "album" => self.fields.album.clone(),
            "albumartist" => self.fields.album_artist.clone(),
            "title" => self.fields.title.clone(),
            "genre" => self.fields.genre.clone(),
            "media" => self.fields.media.clone(),
            "comment" => self.fields.comment.clone(),
            other => self.comments_first(other).map(str::to_string),
        }
    }

    /// Fetch a builtin integer field by filter key. Missing tags resolve to
    /// `-1`, matching the filter evaluator's "unset" convention.
    pub fn field_int(&self, key: &str) -> i64 {
        match key {
            "duration" => {
                if self.locator.is_http() {
                    i64::MAX
                } else {
                    self.ints.duration.unwrap_or(-1)
                }
            }
            "date" => self.ints.date.map(|d| d / 10000).unwrap_or(-1),
            "originaldate" => self.ints.original_date.map(|d| d / 10000).unwrap_or(-1),
            "bitrate" => self
                .ints
                .bitrate
                .map(|b| (b as f64 / 1000.0).round() as i64)
                .unwrap_or(-1),
            "play_count" => self.play_count() as i64,
            "bpm" => self.ints.bpm.unwrap_or(-1),
            "tracknumber" => self.ints.track_number.unwrap_or(-1),
            "discnumber" => self.ints.disc_number.unwrap_or(-1),
            other => self
                .comments_first(other)
                .and_then(parse_leading_int)
                .unwrap_or(-1),
        }
    }

    /// `stream` boolean builtin: true iff the locator is an HTTP(S) URL.
    pub fn is_stream(&self) -> bool {
        self.locator.is_http()
    }

    /// `tag` boolean builtin: true iff artist/album/title is set.
    pub fn has_tag(&self) -> bool {
        self.fields.artist.is_some() || self.fields.album.is_some() || self.fields.title.is_some()
    }
}

/// Whether an `Arc<Track>` has exactly one holder.
pub fn is_unique(t: &std::sync::Arc<Track>) -> bool {
    std::sync::Arc::strong_count(t) == 1
}

fn is_truthy(s: &str) -> bool {
    let s = s.trim();
    s == "1" || unicode::eq_fold(s, "true") || unicode::eq_fold(s, "yes")
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        s[..end].parse::<i64>().ok()
    }
}

fn parse_gain_float(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_suffix("dB")
        .or_else(|| trimmed.strip_suffix("db"))
        .unwrap_or(trimmed)
        .trim();
    trimmed.parse::<f64>().ok()
}

fn r128_to_gain(r128: i64) -> f64 {
    ((r128 as f64 / 256.0 + 5.0) * 100.0).round() / 100.0
}

/// Parse a date tag into a `YYYYMMDD` integer. Missing month/day default to 01.
fn parse_date_yyyymmdd(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let mut parts = s.splitn(3, |c: char| c == '-' || c == '/');
    let year: i64 = parts.next()?.trim().parse().ok()?;
    let month: i64 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(1);
    let day: i64 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(1);
    if (1..=12).contains(&month) && (1..=31).contains(&day) {
        Some(year * 10000 + month * 100 + day)
    } else if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        Some(year * 10000 + 101)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(comments: &[(&str, &str)]) -> Track {
        let mut t = Track::new(Locator::Path(PathBuf::from("/music/a.flac")));
        t.attach_comments(comments.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
        t
    }

    #[test]
    fn uid_increases() {
        let a = Track::new(Locator::Path(PathBuf::from("/a")));
        let b = Track::new(Locator::Path(PathBuf::from("/b")));
        assert!(b.uid() > a.uid());
    }

    #[test]
    fn albumartist_falls_back_to_artist() {
        let t = track(&[("artist", "Miles Davis")]);
        assert_eq!(t.album_artist(), Some("Miles Davis"));
    }

    #[test]
    fn title_falls_back_to_basename_when_other_tags_present() {
        let t = track(&[("artist", "Miles Davis")]);
        assert_eq!(t.title(), Some("a"));
    }

    #[test]
    fn title_stays_unset_with_no_tags_at_all() {
        let t = track(&[]);
        assert_eq!(t.title(), None);
    }

    #[test]
    fn date_parses_year_only() {
        let t = track(&[("date", "1959")]);
        assert_eq!(t.field_int("date"), 1959);
    }

    #[test]
    fn date_missing_is_minus_one() {
        let t = track(&[]);
        assert_eq!(t.field_int("date"), -1);
    }

    #[test]
    fn duration_clamps_for_http() {
        let mut t = Track::new(Locator::Url("http://example.com/stream".into()));
        t.attach_comments(Comments::new());
        t.set_duration(10);
        assert_eq!(t.field_int("duration"), i64::MAX);
    }

    #[test]
    fn bitrate_rounds_to_kbps() {
        let mut t = track(&[]);
        t.set_bitrate(320_300);
        assert_eq!(t.field_int("bitrate"), 320);
    }

    #[test]
    fn r128_gain_conversion() {
        let t = track(&[("r128_track_gain", "-512")]);
        assert_eq!(t.replaygain_track_gain(), Some(3.0));
    }

    #[test]
    fn replaygain_float_strips_db_suffix() {
        let t = track(&[("replaygain_track_gain", "-6.50 dB")]);
        assert_eq!(t.replaygain_track_gain(), Some(-6.5));
    }

    #[test]
    fn compilation_flag_from_comment() {
        let t = track(&[("compilation", "1")]);
        assert!(t.compilation());
    }

    #[test]
    fn play_count_increments_under_lock() {
        let t = track(&[]);
        assert_eq!(t.play_count(), 0);
        t.increment_play_count();
        assert_eq!(t.play_count(), 1);
    }
}
