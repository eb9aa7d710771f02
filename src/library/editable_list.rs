//! Flat sorted view over the library with a scrolling selection window and
//! a mark set, standing in for spec §4.6's doubly linked list (a `Vec` kept
//! sorted gives the same "stable logical order, O(log n) lookup" behavior
//! idiomatically — see DESIGN.md). Grounded on
//! `ompl/src/library/tree.rs`/`ompl/src/library/types.rs`'s sorted
//! `SongList`, generalized to a multi-key comparator with per-key direction.

use std::cmp::Ordering;
use std::sync::Arc;

use lexical_sort::natural_lexical_cmp;
use serde::{Deserialize, Serialize};

use crate::track::Track;
use crate::unicode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Str,
    Int,
    Float,
    FileMtime,
}

fn field_kind(key: &str) -> FieldKind {
    match key {
        "replaygain_track_gain" | "replaygain_album_gain" | "replaygain_track_peak" | "replaygain_album_peak" => {
            FieldKind::Float
        }
        "filemtime" => FieldKind::FileMtime,
        "tracknumber" | "discnumber" | "date" | "originaldate" | "bitrate" | "bpm" | "play_count" | "duration" => {
            FieldKind::Int
        }
        _ => FieldKind::Str,
    }
}

fn float_field(t: &Track, key: &str) -> Option<f64> {
    match key {
        "replaygain_track_gain" => t.replaygain_track_gain(),
        "replaygain_album_gain" => t.replaygain_album_gain(),
        "replaygain_track_peak" => t.replaygain_track_peak(),
        "replaygain_album_peak" => t.replaygain_album_peak(),
        _ => None,
    }
}

/// NaN (and the absence of a value) sorts smallest, matching spec §4.6.
fn cmp_float_nan_smallest(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            if x.is_nan() && y.is_nan() {
                Ordering::Equal
            } else if x.is_nan() {
                Ordering::Less
            } else if y.is_nan() {
                Ordering::Greater
            } else {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        }
    }
}

/// One field in the active sort, with its direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

/// Compare two tracks by a sequence of sort keys, each breaking ties left
/// over right, per spec §4.6.
pub fn compare_tracks(a: &Track, b: &Track, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = match field_kind(&key.field) {
            FieldKind::Str => {
                let sa = a.field_string(&key.field).unwrap_or_default();
                let sb = b.field_string(&key.field).unwrap_or_default();
                natural_lexical_cmp(&unicode::fold_case(&sa), &unicode::fold_case(&sb))
            }
            FieldKind::Int => a.field_int(&key.field).cmp(&b.field_int(&key.field)),
            FieldKind::Float => cmp_float_nan_smallest(float_field(a, &key.field), float_field(b, &key.field)),
            FieldKind::FileMtime => a.mtime().cmp(&b.mtime()),
        };
        let ord = if key.direction == Direction::Desc { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// A sorted, markable view over a set of tracks, with a scrolling selection
/// window and a "current" cursor used by sequential (non-shuffled) playback.
#[derive(Debug, Default)]
pub struct EditableList {
    order: Vec<Arc<Track>>,
    keys: Vec<SortKey>,
    marked: std::collections::HashSet<u64>,
    total_duration: i64,
    window_start: usize,
    window_len: usize,
}

impl EditableList {
    pub fn new(keys: Vec<SortKey>) -> Self {
        EditableList { order: Vec::new(), keys, marked: std::collections::HashSet::new(), total_duration: 0, window_start: 0, window_len: 0 }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.order.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Track>> {
        self.order.get(index)
    }

    pub fn index_of(&self, uid: u64) -> Option<usize> {
        self.order.iter().position(|t| t.uid() == uid)
    }

    /// Change the active sort keys and re-sort in place.
    pub fn set_keys(&mut self, keys: Vec<SortKey>) {
        self.keys = keys;
        self.order.sort_by(|a, b| compare_tracks(a, b, &self.keys));
    }

    /// Insert, keeping `order` sorted by the active keys.
    pub fn insert(&mut self, track: Arc<Track>) {
        let pos = self
            .order
            .binary_search_by(|probe| compare_tracks(probe, &track, &self.keys))
            .unwrap_or_else(|p| p);
        self.total_duration += track.field_int("duration").max(0);
        self.order.insert(pos, track);
    }

    pub fn remove(&mut self, uid: u64) -> Option<Arc<Track>> {
        let idx = self.index_of(uid)?;
        let track = self.order.remove(idx);
        self.total_duration -= track.field_int("duration").max(0);
        self.marked.remove(&uid);
        Some(track)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.marked.clear();
        self.total_duration = 0;
        self.window_start = 0;
        self.window_len = 0;
    }

    pub fn total_duration_seconds(&self) -> i64 {
        self.total_duration
    }

    pub fn toggle_mark(&mut self, uid: u64) {
        if !self.marked.remove(&uid) {
            self.marked.insert(uid);
        }
    }

    pub fn is_marked(&self, uid: u64) -> bool {
        self.marked.contains(&uid)
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    pub fn clear_marks(&mut self) {
        self.marked.clear();
    }

    /// Set the visible scrolling window, clamped to the list length.
    pub fn set_window(&mut self, start: usize, len: usize) {
        self.window_start = start.min(self.order.len());
        self.window_len = len;
    }

    pub fn window(&self) -> &[Arc<Track>] {
        let end = (self.window_start + self.window_len).min(self.order.len());
        &self.order[self.window_start.min(end)..end]
    }

    /// In-order successor of `current`, passing `scope`, used by
    /// shuffle=none/sort-order playback.
    pub fn next(&self, current: Option<u64>, scope: &dyn Fn(u64) -> bool) -> Option<Arc<Track>> {
        let start = current.and_then(|u| self.index_of(u)).map(|i| i + 1).unwrap_or(0);
        self.order[start.min(self.order.len())..].iter().find(|t| scope(t.uid())).cloned()
    }

    /// In-order predecessor of `current`, passing `scope`.
    pub fn prev(&self, current: Option<u64>, scope: &dyn Fn(u64) -> bool) -> Option<Arc<Track>> {
        let end = current.and_then(|u| self.index_of(u)).unwrap_or(self.order.len());
        self.order[..end.min(self.order.len())].iter().rev().find(|t| scope(t.uid())).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{Comments, Locator};
    use std::path::PathBuf;

    fn make(title: &str, path: &str) -> Arc<Track> {
        let mut t = Track::new(Locator::Path(PathBuf::from(path)));
        let comments: Comments = vec![("title".into(), title.into())];
        t.attach_comments(comments);
        Arc::new(t)
    }

    fn list() -> EditableList {
        EditableList::new(vec![SortKey { field: "title".into(), direction: Direction::Asc }])
    }

    #[test]
    fn insert_keeps_sorted_order() {
        let mut l = list();
        l.insert(make("Zoo", "/z"));
        l.insert(make("Apple", "/a"));
        l.insert(make("Mango", "/m"));
        let titles: Vec<&str> = l.iter().map(|t| t.title().unwrap()).collect();
        assert_eq!(titles, vec!["Apple", "Mango", "Zoo"]);
    }

    #[test]
    fn desc_direction_reverses_order() {
        let mut l = EditableList::new(vec![SortKey { field: "title".into(), direction: Direction::Desc }]);
        l.insert(make("Apple", "/a"));
        l.insert(make("Zoo", "/z"));
        let titles: Vec<&str> = l.iter().map(|t| t.title().unwrap()).collect();
        assert_eq!(titles, vec!["Zoo", "Apple"]);
    }

    #[test]
    fn remove_updates_total_duration() {
        let mut l = list();
        let mut t = Track::new(Locator::Path(PathBuf::from("/a")));
        t.attach_comments(Comments::new());
        t.set_duration(100);
        let t = Arc::new(t);
        let uid = t.uid();
        l.insert(t);
        assert_eq!(l.total_duration_seconds(), 100);
        l.remove(uid);
        assert_eq!(l.total_duration_seconds(), 0);
    }

    #[test]
    fn float_field_none_sorts_smallest() {
        assert_eq!(cmp_float_nan_smallest(None, Some(1.0)), Ordering::Less);
        assert_eq!(cmp_float_nan_smallest(Some(f64::NAN), Some(1.0)), Ordering::Less);
        assert_eq!(cmp_float_nan_smallest(None, None), Ordering::Equal);
    }

    #[test]
    fn marks_toggle_and_count() {
        let mut l = list();
        let t = make("A", "/a");
        let uid = t.uid();
        l.insert(t);
        assert!(!l.is_marked(uid));
        l.toggle_mark(uid);
        assert!(l.is_marked(uid));
        assert_eq!(l.marked_count(), 1);
        l.toggle_mark(uid);
        assert_eq!(l.marked_count(), 0);
    }

    #[test]
    fn next_and_prev_traverse_sorted_order() {
        let mut l = list();
        let a = make("Apple", "/a");
        let m = make("Mango", "/m");
        let z = make("Zoo", "/z");
        let (ua, um) = (a.uid(), m.uid());
        l.insert(a);
        l.insert(m);
        l.insert(z);
        let next_after_apple = l.next(Some(ua), &|_| true).unwrap();
        assert_eq!(next_after_apple.title(), Some("Mango"));
        let prev_before_mango = l.prev(Some(um), &|_| true).unwrap();
        assert_eq!(prev_before_mango.title(), Some("Apple"));
    }
}
