//! Top-level library facade: a single lock domain over the locator hash,
//! the browsing tree, the editable list and both shuffle orderings, plus
//! the three filter slots and the playback cursor. Grounded on
//! `ompl/src/library/mod.rs`'s `Library` (`RwLockTimeout`/`MutexTimeout`,
//! `Bus<LibEvt>` broadcast, `Arc<Self>`-returning constructor), generalized
//! from its single `tracks`/`filtered_tree` pair to the hash/tree/shuffle
//! split spec §3/§4.5 calls for.

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::sleep;
use std::time::Duration;

use bus::{Bus, BusReader};

use crate::filter::{self, Expr, FilterError};
use crate::logging::*;
use crate::track::{Locator, Track};

pub mod coordinator;
pub mod editable_list;
pub mod playback;
pub mod shuffle;
pub mod tree;

use coordinator::Transition;
use editable_list::{Direction, EditableList, SortKey};
use playback::{Scope, Selector, ShuffleMode};
use shuffle::ShuffleOrder;
use tree::{existence_key, AddOutcome as HashOutcome, Tree};

// ### Timed Lock Traits {{{

macro_rules! timed_guard {
    ($result:expr, $err:literal) => {
        let mut n = 0;
        loop {
            let result = $result;
            match result {
                Err(std::sync::TryLockError::WouldBlock) => (),
                _ => return Ok(result?),
            }
            // 2 seconds per lock should be 100x more than enough
            if n > 2000 {
                break;
            }
            sleep(Duration::from_millis(1));
            n += 1
        }
        error!(concat!($err, " lock timed out."));
        return Err(concat!($err, " lock timed out.").into());
    };
}

trait RwLockTimeout<T> {
    fn timed_read<'a>(&'a self) -> Result<RwLockReadGuard<'a, T>, Box<dyn Error + 'a>>;
    fn timed_write<'a>(&'a self) -> Result<RwLockWriteGuard<'a, T>, Box<dyn Error + 'a>>;
}

impl<T> RwLockTimeout<T> for RwLock<T> {
    fn timed_read<'a>(&'a self) -> Result<RwLockReadGuard<'a, T>, Box<dyn Error + 'a>> {
        timed_guard!(self.try_read(), "Read");
    }

    fn timed_write<'a>(&'a self) -> Result<RwLockWriteGuard<'a, T>, Box<dyn Error + 'a>> {
        timed_guard!(self.try_write(), "Write");
    }
}

trait MutexTimeout<T> {
    fn timed_lock<'a>(&'a self) -> Result<MutexGuard<'a, T>, Box<dyn Error + 'a>>;
}

impl<T> MutexTimeout<T> for Mutex<T> {
    fn timed_lock<'a>(&'a self) -> Result<MutexGuard<'a, T>, Box<dyn Error + 'a>> {
        timed_guard!(self.try_lock(), "Mutex");
    }
}

// }}}

/// Events broadcast to every subscriber after a library mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibEvt {
    /// Current track or playback cursor changed.
    Playback,
    /// Tree/list contents changed: add, remove, filter, sort or reshuffle.
    Update,
    /// Non-fatal error (I/O, lock timeout) worth surfacing to the UI.
    Error(String),
}

/// Error surface crossing the library's API boundary, per spec §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibError {
    Filter(FilterError),
    Locked(String),
}

impl std::fmt::Display for LibError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibError::Filter(e) => write!(f, "{e}"),
            LibError::Locked(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for LibError {}

impl From<FilterError> for LibError {
    fn from(e: FilterError) -> Self {
        LibError::Filter(e)
    }
}

/// Outcome of `Library::add`, per spec §7's "duplicate add returns a
/// not-inserted indicator, not surfaced unless the caller chooses to".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    RejectedByAddFilter,
    DuplicateLocator,
    DuplicateExisting,
}

/// Which view `iterate` should walk: the tree in artist/album/track order,
/// or the editable (sorted) list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Tree,
    EditableList,
}

pub struct Library {
    /// Filter-independent locator hash, the master de-dup store.
    hash: RwLock<Tree>,
    /// View: the filtered browsing tree (artist -> album -> track).
    view_tree: RwLock<Tree>,
    /// View: the flat sorted list.
    editable_list: RwLock<EditableList>,
    track_shuffle: RwLock<ShuffleOrder>,
    album_shuffle: RwLock<ShuffleOrder>,

    add_filter: RwLock<Option<Expr>>,
    view_filter: RwLock<Option<Expr>>,
    live_filter: RwLock<Option<String>>,
    named_filters: RwLock<std::collections::HashMap<String, String>>,

    current: RwLock<Option<Arc<Track>>>,
    shuffle_mode: RwLock<ShuffleMode>,
    scope: RwLock<Scope>,
    sort_flag: AtomicBool,
    repeat: AtomicBool,
    sort_keys: RwLock<Vec<SortKey>>,

    bus: Mutex<Bus<LibEvt>>,
}

impl Library {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hash: RwLock::new(Tree::new(true)),
            view_tree: RwLock::new(Tree::new(false)),
            editable_list: RwLock::new(EditableList::new(Vec::new())),
            track_shuffle: RwLock::new(ShuffleOrder::new()),
            album_shuffle: RwLock::new(ShuffleOrder::new()),
            add_filter: RwLock::new(None),
            view_filter: RwLock::new(None),
            live_filter: RwLock::new(None),
            named_filters: RwLock::new(std::collections::HashMap::new()),
            current: RwLock::new(None),
            shuffle_mode: RwLock::new(ShuffleMode::None),
            scope: RwLock::new(Scope::All),
            sort_flag: AtomicBool::new(false),
            repeat: AtomicBool::new(false),
            sort_keys: RwLock::new(Vec::new()),
            bus: Mutex::new(Bus::new(99)),
        })
    }

    fn broadcast(&self, message: LibEvt) {
        if let Ok(mut bus) = self.bus.timed_lock() {
            bus.broadcast(message)
        }
    }

    /// Receiver for all library events.
    pub fn get_receiver(&self) -> Result<BusReader<LibEvt>, Box<dyn Error>> {
        Ok(self.bus.timed_lock().map_err(|e| e.to_string())?.add_rx())
    }

    // ## Named filters, for `check_leaves`'s bare-boolean resolver ## {{{

    pub fn define_filter(&self, name: &str, expr_source: &str) {
        if let Ok(mut map) = self.named_filters.timed_write() {
            map.insert(name.to_string(), expr_source.to_string());
        }
    }

    pub fn undefine_filter(&self, name: &str) {
        if let Ok(mut map) = self.named_filters.timed_write() {
            map.remove(name);
        }
    }

    fn resolve_named(&self, name: &str) -> Option<String> {
        self.named_filters.timed_read().ok()?.get(name).cloned()
    }

    /// Parse `source`, splicing in any bare-boolean named-filter references.
    fn compile(&self, source: &str) -> Result<Expr, LibError> {
        let mut expr = crate::filter::parser::parse(source).map_err(FilterError::from)?;
        let mut resolve = |name: &str| self.resolve_named(name);
        filter::check_leaves(&mut expr, &mut resolve)?;
        Ok(expr)
    }

    // ## Named filters ## }}}

    // ## Add / remove / clear ## {{{

    /// Add a track: gate it through the add-filter, insert into the
    /// filter-independent hash, then (if it also passes the view-filter and
    /// live-filter) admit it into the views. Per spec §4.5/§8 property 9.
    pub fn add(&self, track: Track) -> Result<AddOutcome, LibError> {
        let track = Arc::new(track);

        if let Some(add_filter) = self.add_filter.timed_read().map_err(|e| LibError::Locked(e.to_string()))?.as_ref() {
            if !filter::evaluate(add_filter, &track) {
                debug!("Track rejected by add-filter: {}", track.locator().display());
                return Ok(AddOutcome::RejectedByAddFilter);
            }
        }

        let mut hash = self.hash.timed_write().map_err(|e| LibError::Locked(e.to_string()))?;
        let (outcome, _) = hash.insert(Arc::clone(&track));
        drop(hash);
        let outcome = match outcome {
            HashOutcome::Inserted => AddOutcome::Inserted,
            HashOutcome::DuplicateLocator => {
                debug!("Duplicate locator on add: {}", track.locator().display());
                return Ok(AddOutcome::DuplicateLocator);
            }
            HashOutcome::DuplicateExisting => {
                debug!("Duplicate metadata on add: {}", track.locator().display());
                return Ok(AddOutcome::DuplicateExisting);
            }
        };

        self.admit_to_views(track);
        self.broadcast(LibEvt::Update);
        Ok(outcome)
    }

    /// Splice a hash-resident track into the views if it passes both the
    /// view-filter and the live-filter.
    fn admit_to_views(&self, track: Arc<Track>) {
        let view_ok = self
            .view_filter
            .timed_read()
            .ok()
            .and_then(|g| g.as_ref().map(|e| filter::evaluate(e, &track)))
            .unwrap_or(true);
        let live_ok = self
            .live_filter
            .timed_read()
            .ok()
            .and_then(|g| g.as_ref().map(|s| self.track_matches_live(&track, s)))
            .unwrap_or(true);
        if !(view_ok && live_ok) {
            return;
        }

        if let Ok(mut tree) = self.view_tree.timed_write() {
            let (_, new_album_id) = tree.insert(Arc::clone(&track));
            if let Some(album_id) = new_album_id {
                if let Ok(mut shuf) = self.album_shuffle.timed_write() {
                    shuf.insert(album_id);
                }
            }
        }
        if let Ok(mut shuf) = self.track_shuffle.timed_write() {
            shuf.insert(track.uid());
        }
        if let Ok(mut list) = self.editable_list.timed_write() {
            list.insert(track);
        }
    }

    fn track_matches_live(&self, track: &Track, text: &str) -> bool {
        match coordinator::compile_live_filter(text) {
            Ok(expr) => filter::evaluate(&expr, track),
            Err(_) => true,
        }
    }

    pub fn remove(&self, locator: &Locator) -> Result<bool, LibError> {
        let removed = self.hash.timed_write().map_err(|e| LibError::Locked(e.to_string()))?.remove(locator);
        let Some((track, _)) = removed else {
            return Ok(false);
        };

        if let Ok(mut tree) = self.view_tree.timed_write() {
            if let Some((_, pruned_album)) = tree.remove(locator) {
                if let Some(album_id) = pruned_album {
                    if let Ok(mut shuf) = self.album_shuffle.timed_write() {
                        shuf.remove(album_id);
                    }
                }
            }
        }
        if let Ok(mut shuf) = self.track_shuffle.timed_write() {
            shuf.remove(track.uid());
        }
        if let Ok(mut list) = self.editable_list.timed_write() {
            list.remove(track.uid());
        }
        if self.current.timed_read().ok().and_then(|g| g.clone()).map(|t| t.uid()) == Some(track.uid()) {
            if let Ok(mut cur) = self.current.timed_write() {
                *cur = None;
            }
        }
        self.broadcast(LibEvt::Update);
        Ok(true)
    }

    pub fn clear_all(&self) {
        if let Ok(mut hash) = self.hash.timed_write() {
            hash.clear();
        }
        if let Ok(mut tree) = self.view_tree.timed_write() {
            tree.clear();
        }
        if let Ok(mut list) = self.editable_list.timed_write() {
            list.clear();
        }
        if let Ok(mut shuf) = self.track_shuffle.timed_write() {
            *shuf = ShuffleOrder::new();
        }
        if let Ok(mut shuf) = self.album_shuffle.timed_write() {
            *shuf = ShuffleOrder::new();
        }
        if let Ok(mut cur) = self.current.timed_write() {
            *cur = None;
        }
        self.broadcast(LibEvt::Update);
    }

    // ## Add / remove / clear ## }}}

    // ## Filter slots ## {{{

    pub fn set_add_filter(&self, source: Option<&str>) -> Result<(), LibError> {
        let new = source.map(|s| self.compile(s)).transpose()?;
        if let Ok(mut slot) = self.add_filter.timed_write() {
            *slot = new;
        }
        Ok(())
    }

    pub fn set_view_filter(&self, source: Option<&str>) -> Result<(), LibError> {
        let new = source.map(|s| self.compile(s)).transpose()?;
        let transition = {
            let old = self.view_filter.timed_read().map_err(|e| LibError::Locked(e.to_string()))?;
            coordinator::decide_expr_transition(old.as_ref(), new.as_ref())
        };
        if let Ok(mut slot) = self.view_filter.timed_write() {
            *slot = new;
        }
        self.apply_transition(transition);
        Ok(())
    }

    pub fn set_live_filter(&self, text: Option<&str>) -> Result<(), LibError> {
        // Compiling here, ahead of committing the new text, keeps a parse
        // failure from touching the previous filter (spec §7: atomic
        // application, previous filter stays in force on parse failure).
        let _validated = text.map(coordinator::compile_live_filter).transpose().map_err(LibError::from)?;
        let transition = {
            let old = self.live_filter.timed_read().map_err(|e| LibError::Locked(e.to_string()))?;
            coordinator::decide_live_filter_transition(old.as_deref(), text)
        };
        if let Ok(mut slot) = self.live_filter.timed_write() {
            *slot = text.map(|s| s.to_string());
        }
        self.apply_transition(transition);
        Ok(())
    }

    /// Step 2-4 of spec §4.9: save the current track, clear-and-rebuild or
    /// incrementally prune, reset the selection window, then restore the
    /// current track if it's still visible.
    fn apply_transition(&self, transition: Transition) {
        let saved_current = self.current.timed_read().ok().and_then(|g| g.clone());

        match transition {
            Transition::Rebuild => self.rebuild_views(),
            Transition::Prune => self.prune_views(),
        }

        if let Ok(mut list) = self.editable_list.timed_write() {
            let len = list.len();
            list.set_window(0, len);
        }

        if let Ok(mut cur) = self.current.timed_write() {
            if let Some(track) = saved_current {
                let still_visible = self
                    .view_tree
                    .timed_read()
                    .ok()
                    .map(|tree| tree.get_by_locator(track.locator()).is_some())
                    .unwrap_or(false);
                *cur = if still_visible { Some(track) } else { None };
            }
        }

        self.broadcast(LibEvt::Update);
    }

    /// Drop every view and re-walk the hash, re-admitting tracks that now
    /// pass both the view-filter and live-filter.
    fn rebuild_views(&self) {
        if let Ok(mut tree) = self.view_tree.timed_write() {
            tree.clear();
        }
        if let Ok(mut list) = self.editable_list.timed_write() {
            list.clear();
        }
        if let Ok(mut shuf) = self.track_shuffle.timed_write() {
            *shuf = ShuffleOrder::new();
        }
        if let Ok(mut shuf) = self.album_shuffle.timed_write() {
            *shuf = ShuffleOrder::new();
        }

        let tracks: Vec<Arc<Track>> = match self.hash.timed_read() {
            Ok(hash) => hash.iter_tree_order().cloned().collect(),
            Err(_) => return,
        };
        for track in tracks {
            self.admit_to_views(track);
        }
    }

    /// Remove from the views every track that now fails the view-filter or
    /// live-filter, without touching the hash.
    fn prune_views(&self) {
        let to_drop: Vec<Locator> = {
            let Ok(tree) = self.view_tree.timed_read() else { return };
            let view_filter = self.view_filter.timed_read().ok();
            let live_filter = self.live_filter.timed_read().ok();
            tree.iter_tree_order()
                .filter(|t| {
                    let view_ok = view_filter.as_ref().and_then(|g| g.as_ref()).map(|e| filter::evaluate(e, t)).unwrap_or(true);
                    let live_ok = live_filter
                        .as_ref()
                        .and_then(|g| g.as_ref())
                        .map(|s| self.track_matches_live(t, s))
                        .unwrap_or(true);
                    !(view_ok && live_ok)
                })
                .map(|t| t.locator().clone())
                .collect()
        };

        for locator in &to_drop {
            if let Ok(mut tree) = self.view_tree.timed_write() {
                if let Some((track, pruned_album)) = tree.remove(locator) {
                    if let Some(album_id) = pruned_album {
                        if let Ok(mut shuf) = self.album_shuffle.timed_write() {
                            shuf.remove(album_id);
                        }
                    }
                    if let Ok(mut shuf) = self.track_shuffle.timed_write() {
                        shuf.remove(track.uid());
                    }
                    if let Ok(mut list) = self.editable_list.timed_write() {
                        list.remove(track.uid());
                    }
                }
            }
        }
    }

    // ## Filter slots ## }}}

    // ## Sort / shuffle / scope / repeat settings ## {{{

    /// Parse a space-separated list of sort-key names, each with an
    /// optional leading `-` for descending, per spec §6 `set-sort`.
    pub fn set_sort(&self, spec: &str) {
        let keys: Vec<SortKey> = spec
            .split_whitespace()
            .map(|tok| {
                if let Some(field) = tok.strip_prefix('-') {
                    SortKey { field: field.to_string(), direction: Direction::Desc }
                } else {
                    SortKey { field: tok.to_string(), direction: Direction::Asc }
                }
            })
            .collect();
        if let Ok(mut slot) = self.sort_keys.timed_write() {
            *slot = keys.clone();
        }
        if let Ok(mut list) = self.editable_list.timed_write() {
            list.set_keys(keys);
        }
        self.broadcast(LibEvt::Update);
    }

    pub fn shuffle_mode_get(&self) -> ShuffleMode {
        *self.shuffle_mode.timed_read().as_deref().unwrap_or(&ShuffleMode::None)
    }

    pub fn shuffle_mode_set(&self, mode: ShuffleMode) {
        if let Ok(mut slot) = self.shuffle_mode.timed_write() {
            *slot = mode;
        }
        self.broadcast(LibEvt::Playback);
    }

    pub fn scope_get(&self) -> Scope {
        *self.scope.timed_read().as_deref().unwrap_or(&Scope::All)
    }

    pub fn scope_set(&self, scope: Scope) {
        if let Ok(mut slot) = self.scope.timed_write() {
            *slot = scope;
        }
    }

    pub fn sort_flag_get(&self) -> bool {
        self.sort_flag.load(Ordering::Relaxed)
    }

    pub fn sort_flag_set(&self, flag: bool) {
        self.sort_flag.store(flag, Ordering::Relaxed);
    }

    pub fn repeat_get(&self) -> bool {
        self.repeat.load(Ordering::Relaxed)
    }

    pub fn repeat_set(&self, repeat: bool) {
        self.repeat.store(repeat, Ordering::Relaxed);
    }

    pub fn reshuffle_tracks(&self) {
        if let Ok(mut shuf) = self.track_shuffle.timed_write() {
            shuf.reshuffle();
        }
        self.broadcast(LibEvt::Update);
    }

    pub fn reshuffle_albums(&self) {
        if let Ok(mut shuf) = self.album_shuffle.timed_write() {
            shuf.reshuffle();
        }
        self.broadcast(LibEvt::Update);
    }

    // ## Sort / shuffle / scope / repeat settings ## }}}

    // ## Playback ## {{{

    pub fn current(&self) -> Option<Arc<Track>> {
        self.current.timed_read().ok().and_then(|g| g.clone())
    }

    /// Force a specific track current, per spec §6 `set-current`. No-op if
    /// the track isn't in the current views.
    pub fn set_current(&self, track: Option<Arc<Track>>) {
        let valid = match &track {
            None => true,
            Some(t) => self.view_tree.timed_read().ok().map(|tree| tree.get_by_locator(t.locator()).is_some()).unwrap_or(false),
        };
        if !valid {
            return;
        }
        if let Ok(mut cur) = self.current.timed_write() {
            *cur = track;
        }
        self.broadcast(LibEvt::Playback);
    }

    fn with_selector<R>(&self, f: impl FnOnce(&Selector) -> R) -> Option<R> {
        let tree = self.view_tree.timed_read().ok()?;
        let track_shuffle = self.track_shuffle.timed_read().ok()?;
        let album_shuffle = self.album_shuffle.timed_read().ok()?;
        let list = self.editable_list.timed_read().ok()?;
        let sel = Selector { tree: &tree, track_shuffle: &track_shuffle, album_shuffle: &album_shuffle, list: &list };
        Some(f(&sel))
    }

    pub fn next(&self) {
        let current = self.current().map(|t| t.uid());
        let mode = self.shuffle_mode_get();
        let sort_flag = self.sort_flag_get();
        let scope = self.scope_get();
        let repeat = self.repeat_get();
        let next = self.with_selector(|sel| sel.next(current, mode, sort_flag, scope, repeat)).flatten();
        self.set_current(next);
    }

    pub fn prev(&self) {
        let current = self.current().map(|t| t.uid());
        let mode = self.shuffle_mode_get();
        let sort_flag = self.sort_flag_get();
        let scope = self.scope_get();
        let repeat = self.repeat_get();
        let prev = self.with_selector(|sel| sel.prev(current, mode, sort_flag, scope, repeat)).flatten();
        self.set_current(prev);
    }

    pub fn next_album(&self) {
        let current = self.current().map(|t| t.uid());
        let scope = self.scope_get();
        let repeat = self.repeat_get();
        let next = self.with_selector(|sel| sel.next_album(current, scope, repeat)).flatten();
        self.set_current(next);
    }

    pub fn prev_album(&self) {
        let current = self.current().map(|t| t.uid());
        let scope = self.scope_get();
        let repeat = self.repeat_get();
        let prev = self.with_selector(|sel| sel.prev_album(current, scope, repeat)).flatten();
        self.set_current(prev);
    }

    // ## Playback ## }}}

    // ## Views ## {{{

    /// Walk the requested view's tracks in its own order, per spec §6
    /// `iterate(view, visitor)`.
    pub fn iterate(&self, view: View, mut visitor: impl FnMut(&Arc<Track>)) {
        match view {
            View::Tree => {
                if let Ok(tree) = self.view_tree.timed_read() {
                    tree.iter_tree_order().for_each(&mut visitor);
                }
            }
            View::EditableList => {
                if let Ok(list) = self.editable_list.timed_read() {
                    list.iter().for_each(&mut visitor);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.view_tree.timed_read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn toggle_mark(&self, uid: u64) {
        if let Ok(mut list) = self.editable_list.timed_write() {
            list.toggle_mark(uid);
        }
    }

    pub fn marked_count(&self) -> usize {
        self.editable_list.timed_read().map(|l| l.marked_count()).unwrap_or(0)
    }

    pub fn clear_marks(&self) {
        if let Ok(mut list) = self.editable_list.timed_write() {
            list.clear_marks();
        }
    }

    // ## Views ## }}}
}

/// The tuple two tracks sharing the same "already exists" metadata key
/// resolve to: exposed for callers that want to pre-check before scanning.
pub fn existence_key_of(track: &Track) -> (String, String, i64, i64, String) {
    existence_key(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Comments;
    use std::path::PathBuf;

    fn make(artist: &str, album: &str, title: &str, track_no: i64, path: &str) -> Track {
        let mut t = Track::new(Locator::Path(PathBuf::from(path)));
        let comments: Comments = vec![
            ("artist".into(), artist.into()),
            ("album".into(), album.into()),
            ("title".into(), title.into()),
            ("tracknumber".into(), track_no.to_string()),
        ];
        t.attach_comments(comments);
        t
    }

    #[test]
    fn duplicate_add_reports_single_entry_in_hash_and_views() {
        let lib = Library::new();
        let t1 = make("Miles Davis", "Kind of Blue", "So What", 1, "/a.mp3");
        let t2 = make("Miles Davis", "Kind of Blue", "So What", 1, "/a.mp3");
        assert!(matches!(lib.add(t1).unwrap(), AddOutcome::Inserted));
        assert!(matches!(lib.add(t2).unwrap(), AddOutcome::DuplicateLocator));
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn clearing_view_filter_restores_every_track() {
        let lib = Library::new();
        lib.add(make("Miles Davis", "Kind of Blue", "So What", 1, "/a.mp3")).unwrap();
        lib.add(make("Chet Baker", "Chet", "Alone Together", 1, "/b.mp3")).unwrap();
        lib.set_view_filter(Some(r#"artist="Miles*""#)).unwrap();
        assert_eq!(lib.len(), 1);
        lib.set_view_filter(None).unwrap();
        assert_eq!(lib.len(), 2);
    }

    #[test]
    fn next_then_prev_returns_to_same_track_when_unshuffled() {
        let lib = Library::new();
        lib.add(make("Artist", "Album", "First", 1, "/1.mp3")).unwrap();
        lib.add(make("Artist", "Album", "Second", 2, "/2.mp3")).unwrap();
        lib.next();
        let first = lib.current().unwrap();
        lib.next();
        lib.prev();
        assert_eq!(lib.current().unwrap(), first);
    }

    #[test]
    fn reshuffle_preserves_track_count() {
        let lib = Library::new();
        for n in 0..5 {
            lib.add(make("Artist", "Album", "Track", n, &format!("/{n}.mp3"))).unwrap();
        }
        lib.reshuffle_tracks();
        assert_eq!(lib.len(), 5);
    }

    #[test]
    fn set_current_ignores_track_not_in_view() {
        let lib = Library::new();
        lib.add(make("Artist", "Album", "First", 1, "/1.mp3")).unwrap();
        let outside = Arc::new(make("Other", "Other", "Outside", 1, "/outside.mp3"));
        lib.set_current(Some(outside));
        assert!(lib.current().is_none());
    }
}
