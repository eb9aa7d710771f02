//! Locator-keyed de-dup index plus the three-level artist/album/track tree.
//! Grounded on spec §3/§4.5 and `ompl/src/library/mod.rs`'s `Lib::tree`
//! (a `BTreeMap` keyed by collated artist, each holding a `BTreeMap` of
//! albums) — the shape this crate's tree borrows directly, generalized to
//! album-artist disambiguation and the "merge various-artists albums" rule
//! spec §4.5 calls for.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use crate::track::{Locator, Track};
use crate::unicode;

/// Sort key for an album within an artist: collated name, release year, and
/// the collated album-artist, so same-named albums by different artists
/// don't collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlbumKey {
    pub collated_name: String,
    pub year: i64,
    pub album_artist_disambig: String,
}

/// Sort key for a track within an album: disc, track number, collated
/// title, then filename as a final tiebreak.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrackKey {
    pub disc: i64,
    pub track: i64,
    pub collated_title: String,
    pub filename: String,
}

#[derive(Debug)]
pub struct Album {
    pub name: String,
    pub album_id: u64,
    pub compilation: bool,
    tracks: BTreeMap<TrackKey, Arc<Track>>,
}

impl Album {
    fn new(name: String, album_id: u64) -> Self {
        Album { name, album_id, compilation: false, tracks: BTreeMap::new() }
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// An album is a compilation if any member track says so, or if its
    /// tracks span more than one distinct artist.
    fn recompute_compilation(&mut self) {
        let explicit = self.tracks.values().any(|t| t.compilation());
        let distinct_artists: std::collections::HashSet<&str> =
            self.tracks.values().filter_map(|t| t.artist()).collect();
        self.compilation = explicit || distinct_artists.len() > 1;
    }
}

#[derive(Debug)]
pub struct Artist {
    pub name: String,
    albums: BTreeMap<AlbumKey, Album>,
}

impl Artist {
    fn new(name: String) -> Self {
        Artist { name, albums: BTreeMap::new() }
    }

    pub fn albums(&self) -> impl Iterator<Item = (&AlbumKey, &Album)> {
        self.albums.iter()
    }

    pub fn album(&self, key: &AlbumKey) -> Option<&Album> {
        self.albums.get(key)
    }
}

/// The tuple the "already exists" secondary check and the library's
/// filter-independent existence index both key on.
pub fn existence_key(track: &Track) -> (String, String, i64, i64, String) {
    let collated_artist = unicode::collate_key(track.album_artist().unwrap_or(""));
    let collated_album = unicode::collate_key(track.album().unwrap_or(""));
    let collated_title = unicode::collate_key(track.title().unwrap_or(""));
    let disc = track.disc_number().unwrap_or(0);
    let trackno = track.track_number().unwrap_or(0);
    (collated_artist, collated_album, disc, trackno, collated_title)
}

/// Where a track lives in the tree, for O(1) scope resolution and removal.
#[derive(Debug, Clone)]
struct Location {
    artist: String,
    album: AlbumKey,
    track: TrackKey,
}

#[derive(Debug, Clone, Copy)]
pub enum AddOutcome {
    Inserted,
    DuplicateLocator,
    DuplicateExisting,
}

/// The library index: a locator hash for de-dup plus the browsing tree.
#[derive(Debug)]
pub struct Tree {
    artists: BTreeMap<String, Artist>,
    by_locator: HashMap<Locator, Arc<Track>>,
    location_of: HashMap<u64, Location>,
    existence: HashMap<(String, String, i64, i64, String), u64>,
    enforce_existence_check: bool,
    next_album_id: u64,
    album_id_of: HashMap<u64, (String, AlbumKey)>,
}

impl Tree {
    pub fn new(enforce_existence_check: bool) -> Self {
        Tree {
            artists: BTreeMap::new(),
            by_locator: HashMap::new(),
            location_of: HashMap::new(),
            existence: HashMap::new(),
            enforce_existence_check,
            next_album_id: 1,
            album_id_of: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_locator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_locator.is_empty()
    }

    pub fn contains_locator(&self, locator: &Locator) -> bool {
        self.by_locator.contains_key(locator)
    }

    pub fn get_by_locator(&self, locator: &Locator) -> Option<&Arc<Track>> {
        self.by_locator.get(locator)
    }

    pub fn artists(&self) -> impl Iterator<Item = (&String, &Artist)> {
        self.artists.iter()
    }

    pub fn artist(&self, name: &str) -> Option<&Artist> {
        self.artists.get(name)
    }

    /// Insert a track, splicing it into the artist/album/track tree. Returns
    /// whether a brand new album (and its id) was created, so callers can
    /// enroll it in an album-level shuffle ordering.
    pub fn insert(&mut self, track: Arc<Track>) -> (AddOutcome, Option<u64>) {
        if self.by_locator.contains_key(track.locator()) {
            return (AddOutcome::DuplicateLocator, None);
        }

        let album_artist = track.album_artist().unwrap_or("").to_string();
        let album_name = track.album().unwrap_or("").to_string();
        let title = track.title().unwrap_or("").to_string();
        let collated_artist = unicode::collate_key(&album_artist);
        let collated_album = unicode::collate_key(&album_name);
        let collated_title = unicode::collate_key(&title);
        let disc = track.disc_number().unwrap_or(0);
        let trackno = track.track_number().unwrap_or(0);
        let year = track.field_int("date");

        let existence_key = (collated_artist.clone(), collated_album.clone(), disc, trackno, collated_title.clone());
        if self.enforce_existence_check && self.existence.contains_key(&existence_key) {
            return (AddOutcome::DuplicateExisting, None);
        }

        self.by_locator.insert(track.locator().clone(), Arc::clone(&track));

        let artist = self
            .artists
            .entry(collated_artist.clone())
            .or_insert_with(|| Artist::new(album_artist.clone()));

        let album_key = AlbumKey {
            collated_name: collated_album.clone(),
            year,
            album_artist_disambig: collated_artist.clone(),
        };

        let mut created_album_id = None;
        if !artist.albums.contains_key(&album_key) {
            let id = self.next_album_id;
            self.next_album_id += 1;
            self.album_id_of.insert(id, (collated_artist.clone(), album_key.clone()));
            artist.albums.insert(album_key.clone(), Album::new(album_name.clone(), id));
            created_album_id = Some(id);
        }
        let album = artist.albums.get_mut(&album_key).expect("just inserted or present");

        let filename = track.locator().display().into_owned();
        let track_key = TrackKey { disc, track: trackno, collated_title: collated_title.clone(), filename };
        album.tracks.insert(track_key.clone(), Arc::clone(&track));
        album.recompute_compilation();

        self.location_of.insert(
            track.uid(),
            Location { artist: collated_artist.clone(), album: album_key, track: track_key },
        );
        if self.enforce_existence_check {
            self.existence.insert(existence_key, track.uid());
        }

        (AddOutcome::Inserted, created_album_id)
    }

    /// Remove a track by locator. Returns the removed track and, if its
    /// album became empty and was pruned, the pruned album's id.
    pub fn remove(&mut self, locator: &Locator) -> Option<(Arc<Track>, Option<u64>)> {
        let track = self.by_locator.remove(locator)?;
        let loc = self.location_of.remove(&track.uid());
        let mut pruned_album = None;

        if let Some(loc) = loc {
            if let Some(artist) = self.artists.get_mut(&loc.artist) {
                if let Some(album) = artist.albums.get_mut(&loc.album) {
                    album.tracks.remove(&loc.track);
                    if album.tracks.is_empty() {
                        pruned_album = Some(album.album_id);
                        artist.albums.remove(&loc.album);
                        self.album_id_of.remove(&pruned_album.unwrap());
                    } else {
                        album.recompute_compilation();
                    }
                }
                if artist.albums.is_empty() {
                    self.artists.remove(&loc.artist);
                }
            }
        }

        if self.enforce_existence_check {
            self.existence.retain(|_, uid| *uid != track.uid());
        }

        Some((track, pruned_album))
    }

    pub fn clear(&mut self) {
        self.artists.clear();
        self.by_locator.clear();
        self.location_of.clear();
        self.existence.clear();
        self.album_id_of.clear();
    }

    pub fn album_location(&self, album_id: u64) -> Option<&(String, AlbumKey)> {
        self.album_id_of.get(&album_id)
    }

    pub fn location_of(&self, uid: u64) -> Option<(&str, &AlbumKey, &TrackKey)> {
        self.location_of.get(&uid).map(|l| (l.artist.as_str(), &l.album, &l.track))
    }

    pub fn track_by_uid(&self, uid: u64) -> Option<Arc<Track>> {
        let loc = self.location_of.get(&uid)?;
        self.artists.get(&loc.artist)?.albums.get(&loc.album)?.tracks.get(&loc.track).cloned()
    }

    pub fn track_artist_matches(&self, uid: u64, collated_artist: &str) -> bool {
        self.location_of.get(&uid).map(|l| l.artist == collated_artist).unwrap_or(false)
    }

    pub fn track_album_matches(&self, uid: u64, collated_artist: &str, album: &AlbumKey) -> bool {
        self.location_of
            .get(&uid)
            .map(|l| l.artist == collated_artist && &l.album == album)
            .unwrap_or(false)
    }

    // --- tree-order navigation, used by the playback selector ---

    pub fn next_track_in_album(&self, artist: &str, album: &AlbumKey, key: &TrackKey) -> Option<Arc<Track>> {
        let alb = self.artists.get(artist)?.albums.get(album)?;
        alb.tracks
            .range((Bound::Excluded(key.clone()), Bound::Unbounded))
            .next()
            .map(|(_, t)| Arc::clone(t))
    }

    pub fn prev_track_in_album(&self, artist: &str, album: &AlbumKey, key: &TrackKey) -> Option<Arc<Track>> {
        let alb = self.artists.get(artist)?.albums.get(album)?;
        alb.tracks
            .range((Bound::Unbounded, Bound::Excluded(key.clone())))
            .next_back()
            .map(|(_, t)| Arc::clone(t))
    }

    pub fn first_track_in_album(&self, artist: &str, album: &AlbumKey) -> Option<Arc<Track>> {
        self.artists.get(artist)?.albums.get(album)?.tracks.values().next().cloned()
    }

    pub fn last_track_in_album(&self, artist: &str, album: &AlbumKey) -> Option<Arc<Track>> {
        self.artists.get(artist)?.albums.get(album)?.tracks.values().next_back().cloned()
    }

    pub fn next_album_in_artist(&self, artist: &str, album: &AlbumKey) -> Option<AlbumKey> {
        self.artists
            .get(artist)?
            .albums
            .range((Bound::Excluded(album.clone()), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone())
    }

    pub fn prev_album_in_artist(&self, artist: &str, album: &AlbumKey) -> Option<AlbumKey> {
        self.artists
            .get(artist)?
            .albums
            .range((Bound::Unbounded, Bound::Excluded(album.clone())))
            .next_back()
            .map(|(k, _)| k.clone())
    }

    pub fn first_album_in_artist(&self, artist: &str) -> Option<AlbumKey> {
        self.artists.get(artist)?.albums.keys().next().cloned()
    }

    pub fn last_album_in_artist(&self, artist: &str) -> Option<AlbumKey> {
        self.artists.get(artist)?.albums.keys().next_back().cloned()
    }

    pub fn next_artist(&self, artist: &str) -> Option<String> {
        self.artists
            .range((Bound::Excluded(artist.to_string()), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone())
    }

    pub fn prev_artist(&self, artist: &str) -> Option<String> {
        self.artists
            .range((Bound::Unbounded, Bound::Excluded(artist.to_string())))
            .next_back()
            .map(|(k, _)| k.clone())
    }

    pub fn first_artist(&self) -> Option<String> {
        self.artists.keys().next().cloned()
    }

    pub fn last_artist(&self) -> Option<String> {
        self.artists.keys().next_back().cloned()
    }

    /// All tracks in tree order (artist, then album, then track), used to
    /// seed the editable list and full-library scans.
    pub fn iter_tree_order(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.artists.values().flat_map(|a| a.albums.values().flat_map(|alb| alb.tracks.values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Comments;
    use std::path::PathBuf;

    fn make(artist: &str, album: &str, title: &str, track_no: i64, path: &str) -> Arc<Track> {
        let mut t = Track::new(Locator::Path(PathBuf::from(path)));
        let comments: Comments = vec![
            ("artist".into(), artist.into()),
            ("album".into(), album.into()),
            ("title".into(), title.into()),
            ("tracknumber".into(), track_no.to_string()),
        ];
        t.attach_comments(comments);
        Arc::new(t)
    }

    #[test]
    fn insert_creates_artist_album_and_reports_new_album_id() {
        let mut tree = Tree::new(false);
        let t = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a.flac");
        let (outcome, album_id) = tree.insert(t);
        assert!(matches!(outcome, AddOutcome::Inserted));
        assert!(album_id.is_some());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn duplicate_locator_is_rejected() {
        let mut tree = Tree::new(false);
        let t1 = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a.flac");
        let t2 = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a.flac");
        tree.insert(t1);
        let (outcome, _) = tree.insert(t2);
        assert!(matches!(outcome, AddOutcome::DuplicateLocator));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn second_track_in_same_album_does_not_create_new_album() {
        let mut tree = Tree::new(false);
        let t1 = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a.flac");
        let t2 = make("Miles Davis", "Kind of Blue", "Freddie Freeloader", 2, "/music/b.flac");
        let (_, id1) = tree.insert(t1);
        let (_, id2) = tree.insert(t2);
        assert!(id1.is_some());
        assert!(id2.is_none());
    }

    #[test]
    fn compilation_detected_from_distinct_artists() {
        let mut tree = Tree::new(false);
        let t1 = make("Artist A", "Various Hits", "Song A", 1, "/music/a.flac");
        let t2 = make("Artist B", "Various Hits", "Song B", 2, "/music/b.flac");
        tree.insert(t1);
        tree.insert(t2);
        let artist = tree.artist("").unwrap(); // no albumartist tag -> collated to ""
        let (_, album) = artist.albums().next().unwrap();
        assert!(album.compilation);
    }

    #[test]
    fn remove_prunes_empty_album_and_artist() {
        let mut tree = Tree::new(false);
        let t = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a.flac");
        tree.insert(t);
        let (_, pruned) = tree.remove(&Locator::Path(PathBuf::from("/music/a.flac"))).unwrap();
        assert!(pruned.is_some());
        assert!(tree.is_empty());
        assert!(tree.artist("miles davis").is_none());
    }

    #[test]
    fn tree_order_within_album_is_by_track_number() {
        let mut tree = Tree::new(false);
        let t2 = make("Miles Davis", "Kind of Blue", "Freddie Freeloader", 2, "/music/b.flac");
        let t1 = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a.flac");
        tree.insert(t2);
        tree.insert(t1);
        let titles: Vec<&str> = tree.iter_tree_order().map(|t| t.title().unwrap()).collect();
        assert_eq!(titles, vec!["So What", "Freddie Freeloader"]);
    }

    #[test]
    fn existence_check_blocks_same_metadata_under_different_locator() {
        let mut tree = Tree::new(true);
        let t1 = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a.flac");
        let t2 = make("Miles Davis", "Kind of Blue", "So What", 1, "/music/a_copy.flac");
        tree.insert(t1);
        let (outcome, _) = tree.insert(t2);
        assert!(matches!(outcome, AddOutcome::DuplicateExisting));
    }
}
