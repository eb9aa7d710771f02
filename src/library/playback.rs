//! The next/previous track decision, composing the tree, the two shuffle
//! orderings, and the editable list per spec §4.8. Grounded on
//! `ompl/src/library/mod.rs`'s `Lib::get_next_track`/`get_prev_track`
//! dispatch over play-order modes, generalized to the album/artist scope
//! bound this crate's tree carries explicitly.

use std::sync::Arc;

use super::editable_list::EditableList;
use super::shuffle::ShuffleOrder;
use super::tree::{AlbumKey, Tree};
use crate::track::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    None,
    Tracks,
    Albums,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Artist,
    Album,
}

/// Borrows the pieces of library state a next/prev decision needs. Built
/// fresh under the library lock for each call; it owns nothing.
pub struct Selector<'a> {
    pub tree: &'a Tree,
    pub track_shuffle: &'a ShuffleOrder,
    pub album_shuffle: &'a ShuffleOrder,
    pub list: &'a EditableList,
}

impl<'a> Selector<'a> {
    pub fn next(&self, current: Option<u64>, mode: ShuffleMode, sort_flag: bool, scope: Scope, repeat: bool) -> Option<Arc<Track>> {
        if self.tree.is_empty() {
            return None;
        }
        match mode {
            ShuffleMode::Tracks => {
                let pred = self.scope_predicate(current, scope);
                let uid = self.track_shuffle.next(current, pred.as_ref())?;
                self.tree.track_by_uid(uid)
            }
            ShuffleMode::Albums => self.albums_mode(current, sort_flag, scope, repeat, true),
            ShuffleMode::None if sort_flag => {
                let pred = self.scope_predicate(current, scope);
                self.list.next(current, pred.as_ref())
            }
            ShuffleMode::None => self.tree_order(current, scope, repeat, true),
        }
    }

    pub fn prev(&self, current: Option<u64>, mode: ShuffleMode, sort_flag: bool, scope: Scope, repeat: bool) -> Option<Arc<Track>> {
        if self.tree.is_empty() {
            return None;
        }
        match mode {
            ShuffleMode::Tracks => {
                let pred = self.scope_predicate(current, scope);
                let uid = self.track_shuffle.prev(current, pred.as_ref())?;
                self.tree.track_by_uid(uid)
            }
            ShuffleMode::Albums => self.albums_mode(current, sort_flag, scope, repeat, false),
            ShuffleMode::None if sort_flag => {
                let pred = self.scope_predicate(current, scope);
                self.list.prev(current, pred.as_ref())
            }
            ShuffleMode::None => self.tree_order(current, scope, repeat, false),
        }
    }

    /// Skip to the first track of the next/previous album, unconditionally
    /// (no within-album stepping).
    pub fn next_album(&self, current: Option<u64>, scope: Scope, repeat: bool) -> Option<Arc<Track>> {
        match current.and_then(|c| self.tree.location_of(c)) {
            None => self.first_track_overall(),
            Some((artist, album, _)) => {
                let artist = artist.to_string();
                if let Some(next) = self.tree.next_album_in_artist(&artist, album) {
                    return self.first_track_of_album(&artist, &next, false);
                }
                if scope == Scope::Album {
                    return None;
                }
                if scope == Scope::Artist {
                    return if repeat {
                        self.tree.first_album_in_artist(&artist).and_then(|a| self.first_track_of_album(&artist, &a, false))
                    } else {
                        None
                    };
                }
                if let Some(next_artist) = self.tree.next_artist(&artist) {
                    if let Some(first_album) = self.tree.first_album_in_artist(&next_artist) {
                        return self.first_track_of_album(&next_artist, &first_album, false);
                    }
                }
                if repeat { self.first_track_overall() } else { None }
            }
        }
    }

    pub fn prev_album(&self, current: Option<u64>, scope: Scope, repeat: bool) -> Option<Arc<Track>> {
        match current.and_then(|c| self.tree.location_of(c)) {
            None => self.last_track_overall(),
            Some((artist, album, _)) => {
                let artist = artist.to_string();
                if let Some(prev) = self.tree.prev_album_in_artist(&artist, album) {
                    return self.last_track_of_album(&artist, &prev, false);
                }
                if scope == Scope::Album {
                    return None;
                }
                if scope == Scope::Artist {
                    return if repeat {
                        self.tree.last_album_in_artist(&artist).and_then(|a| self.last_track_of_album(&artist, &a, false))
                    } else {
                        None
                    };
                }
                if let Some(prev_artist) = self.tree.prev_artist(&artist) {
                    if let Some(last_album) = self.tree.last_album_in_artist(&prev_artist) {
                        return self.last_track_of_album(&prev_artist, &last_album, false);
                    }
                }
                if repeat { self.last_track_overall() } else { None }
            }
        }
    }

    fn scope_predicate(&self, current: Option<u64>, scope: Scope) -> Box<dyn Fn(u64) -> bool + 'a> {
        let tree = self.tree;
        match scope {
            Scope::All => Box::new(|_uid: u64| true),
            Scope::Artist => match current.and_then(|c| tree.location_of(c)) {
                Some((artist, _, _)) => {
                    let artist = artist.to_string();
                    Box::new(move |uid| tree.track_artist_matches(uid, &artist))
                }
                None => Box::new(|_| true),
            },
            Scope::Album => match current.and_then(|c| tree.location_of(c)) {
                Some((artist, album, _)) => {
                    let artist = artist.to_string();
                    let album = album.clone();
                    Box::new(move |uid| tree.track_album_matches(uid, &artist, &album))
                }
                None => Box::new(|_| true),
            },
        }
    }

    fn first_track_of_album(&self, artist: &str, album: &AlbumKey, sort_flag: bool) -> Option<Arc<Track>> {
        if sort_flag {
            let tree = self.tree;
            let artist_s = artist.to_string();
            let album_c = album.clone();
            let pred = move |uid: u64| tree.track_album_matches(uid, &artist_s, &album_c);
            self.list.next(None, &pred)
        } else {
            self.tree.first_track_in_album(artist, album)
        }
    }

    fn last_track_of_album(&self, artist: &str, album: &AlbumKey, sort_flag: bool) -> Option<Arc<Track>> {
        if sort_flag {
            let tree = self.tree;
            let artist_s = artist.to_string();
            let album_c = album.clone();
            let pred = move |uid: u64| tree.track_album_matches(uid, &artist_s, &album_c);
            self.list.prev(None, &pred)
        } else {
            self.tree.last_track_in_album(artist, album)
        }
    }

    fn first_track_overall(&self) -> Option<Arc<Track>> {
        let artist = self.tree.first_artist()?;
        let album = self.tree.first_album_in_artist(&artist)?;
        self.tree.first_track_in_album(&artist, &album)
    }

    fn last_track_overall(&self) -> Option<Arc<Track>> {
        let artist = self.tree.last_artist()?;
        let album = self.tree.last_album_in_artist(&artist)?;
        self.tree.last_track_in_album(&artist, &album)
    }

    fn album_scope_predicate(&self, current_artist: &str, scope: Scope) -> Box<dyn Fn(u64) -> bool + 'a> {
        let tree = self.tree;
        match scope {
            Scope::All => Box::new(|_| true),
            Scope::Artist => {
                let artist = current_artist.to_string();
                Box::new(move |album_id| tree.album_location(album_id).map(|(a, _)| a == &artist).unwrap_or(false))
            }
            Scope::Album => Box::new(|_| false),
        }
    }

    /// shuffle = albums: step through the current album, then hop to the
    /// next/previous album in the album-shuffle ordering.
    fn albums_mode(&self, current: Option<u64>, sort_flag: bool, scope: Scope, repeat: bool, forward: bool) -> Option<Arc<Track>> {
        let (artist, album) = match current.and_then(|c| self.tree.location_of(c)) {
            Some((a, alb, _)) => (a.to_string(), alb.clone()),
            None => {
                let album_id = if forward { self.album_shuffle.next(None, &|_| true) } else { self.album_shuffle.prev(None, &|_| true) }?;
                let (artist, album) = self.tree.album_location(album_id)?.clone();
                return if forward { self.first_track_of_album(&artist, &album, sort_flag) } else { self.last_track_of_album(&artist, &album, sort_flag) };
            }
        };

        let within = if forward {
            self.within_album_step(current.unwrap(), &artist, &album, sort_flag, true)
        } else {
            self.within_album_step(current.unwrap(), &artist, &album, sort_flag, false)
        };
        if within.is_some() {
            return within;
        }

        let cur_album_id = self.tree.artist(&artist)?.album(&album)?.album_id;
        let scope_pred = self.album_scope_predicate(&artist, scope);
        let next_album_id = if forward {
            self.album_shuffle.next(Some(cur_album_id), scope_pred.as_ref())
        } else {
            self.album_shuffle.prev(Some(cur_album_id), scope_pred.as_ref())
        };

        match next_album_id {
            Some(id) => {
                let (next_artist, next_album) = self.tree.album_location(id)?.clone();
                if forward {
                    self.first_track_of_album(&next_artist, &next_album, sort_flag)
                } else {
                    self.last_track_of_album(&next_artist, &next_album, sort_flag)
                }
            }
            None if repeat && scope != Scope::Album => {
                let id = if forward {
                    self.album_shuffle.next(None, scope_pred.as_ref())
                } else {
                    self.album_shuffle.prev(None, scope_pred.as_ref())
                }?;
                let (a, alb) = self.tree.album_location(id)?.clone();
                if forward { self.first_track_of_album(&a, &alb, sort_flag) } else { self.last_track_of_album(&a, &alb, sort_flag) }
            }
            None if repeat && scope == Scope::Album => {
                if forward { self.first_track_of_album(&artist, &album, sort_flag) } else { self.last_track_of_album(&artist, &album, sort_flag) }
            }
            None => None,
        }
    }

    fn within_album_step(&self, current: u64, artist: &str, album: &AlbumKey, sort_flag: bool, forward: bool) -> Option<Arc<Track>> {
        if sort_flag {
            let tree = self.tree;
            let artist_s = artist.to_string();
            let album_c = album.clone();
            let pred = move |uid: u64| tree.track_album_matches(uid, &artist_s, &album_c);
            if forward { self.list.next(Some(current), &pred) } else { self.list.prev(Some(current), &pred) }
        } else {
            let (_, _, track_key) = self.tree.location_of(current)?;
            if forward {
                self.tree.next_track_in_album(artist, album, track_key)
            } else {
                self.tree.prev_track_in_album(artist, album, track_key)
            }
        }
    }

    /// shuffle = none, tree order: within-album, then next album in artist,
    /// then next artist, wrapping to the start only if `repeat`.
    fn tree_order(&self, current: Option<u64>, scope: Scope, repeat: bool, forward: bool) -> Option<Arc<Track>> {
        let cur = match current {
            Some(c) => c,
            None => return if forward { self.first_track_overall() } else { self.last_track_overall() },
        };
        let (artist, album, track_key) = self.tree.location_of(cur)?;
        let artist = artist.to_string();
        let album = album.clone();

        let within = if forward {
            self.tree.next_track_in_album(&artist, &album, track_key)
        } else {
            self.tree.prev_track_in_album(&artist, &album, track_key)
        };
        if within.is_some() {
            return within;
        }
        if scope == Scope::Album {
            return if repeat {
                if forward { self.tree.first_track_in_album(&artist, &album) } else { self.tree.last_track_in_album(&artist, &album) }
            } else {
                None
            };
        }

        let next_album = if forward { self.tree.next_album_in_artist(&artist, &album) } else { self.tree.prev_album_in_artist(&artist, &album) };
        if let Some(next_album) = next_album {
            return if forward { self.first_track_of_album(&artist, &next_album, false) } else { self.last_track_of_album(&artist, &next_album, false) };
        }
        if scope == Scope::Artist {
            return if repeat {
                let a = if forward { self.tree.first_album_in_artist(&artist) } else { self.tree.last_album_in_artist(&artist) }?;
                if forward { self.first_track_of_album(&artist, &a, false) } else { self.last_track_of_album(&artist, &a, false) }
            } else {
                None
            };
        }

        let next_artist = if forward { self.tree.next_artist(&artist) } else { self.tree.prev_artist(&artist) };
        if let Some(next_artist) = next_artist {
            let album = if forward { self.tree.first_album_in_artist(&next_artist) } else { self.tree.last_album_in_artist(&next_artist) };
            if let Some(album) = album {
                return if forward { self.first_track_of_album(&next_artist, &album, false) } else { self.last_track_of_album(&next_artist, &album, false) };
            }
        }

        if repeat {
            if forward { self.first_track_overall() } else { self.last_track_overall() }
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{Comments, Locator};
    use std::path::PathBuf;

    fn make(artist: &str, album: &str, title: &str, track_no: i64, path: &str) -> Arc<Track> {
        let mut t = Track::new(Locator::Path(PathBuf::from(path)));
        let comments: Comments = vec![
            ("albumartist".into(), artist.into()),
            ("album".into(), album.into()),
            ("title".into(), title.into()),
            ("tracknumber".into(), track_no.to_string()),
        ];
        t.attach_comments(comments);
        Arc::new(t)
    }

    /// Scenario E: A1, A2, B1 under one artist, shuffle=albums, scope=all,
    /// repeat off, current=A2 -> next is B1, then next is null.
    #[test]
    fn scenario_e_albums_mode_crosses_album_boundary_then_stops() {
        let mut tree = Tree::new(false);
        let a1 = make("Miles Davis", "Album A", "A1", 1, "/a1");
        let a2 = make("Miles Davis", "Album A", "A2", 2, "/a2");
        let b1 = make("Miles Davis", "Album B", "B1", 1, "/b1");
        let (_, id_a) = tree.insert(a1);
        let (_, id_a2) = tree.insert(a2.clone());
        let (_, id_b) = tree.insert(b1.clone());
        assert!(id_a.is_some());
        assert!(id_a2.is_none());
        assert!(id_b.is_some());

        let mut album_shuffle = ShuffleOrder::new();
        for uid in tree.artists().flat_map(|(_, a)| a.albums()).map(|(_, alb)| alb.album_id) {
            album_shuffle.insert(uid);
        }
        let track_shuffle = ShuffleOrder::new();
        let list = EditableList::new(vec![]);

        let sel = Selector { tree: &tree, track_shuffle: &track_shuffle, album_shuffle: &album_shuffle, list: &list };
        let next = sel.next(Some(a2.uid()), ShuffleMode::Albums, false, Scope::All, false);
        assert_eq!(next.unwrap().title(), Some("B1"));
        let next2 = sel.next(Some(b1.uid()), ShuffleMode::Albums, false, Scope::All, false);
        assert!(next2.is_none());
    }

    #[test]
    fn tree_order_wraps_on_repeat() {
        let mut tree = Tree::new(false);
        let a1 = make("Artist", "Album", "First", 1, "/1");
        let a2 = make("Artist", "Album", "Second", 2, "/2");
        tree.insert(a1.clone());
        tree.insert(a2.clone());

        let track_shuffle = ShuffleOrder::new();
        let album_shuffle = ShuffleOrder::new();
        let list = EditableList::new(vec![]);
        let sel = Selector { tree: &tree, track_shuffle: &track_shuffle, album_shuffle: &album_shuffle, list: &list };

        let end = sel.next(Some(a2.uid()), ShuffleMode::None, false, Scope::All, false);
        assert!(end.is_none());
        let wrapped = sel.next(Some(a2.uid()), ShuffleMode::None, false, Scope::All, true);
        assert_eq!(wrapped.unwrap().title(), Some("First"));
    }

    #[test]
    fn album_scope_never_crosses_album_boundary() {
        let mut tree = Tree::new(false);
        let a1 = make("Artist", "Album A", "First", 1, "/1");
        let b1 = make("Artist", "Album B", "Only", 1, "/2");
        tree.insert(a1.clone());
        tree.insert(b1);

        let track_shuffle = ShuffleOrder::new();
        let album_shuffle = ShuffleOrder::new();
        let list = EditableList::new(vec![]);
        let sel = Selector { tree: &tree, track_shuffle: &track_shuffle, album_shuffle: &album_shuffle, list: &list };

        let result = sel.next(Some(a1.uid()), ShuffleMode::None, false, Scope::Album, false);
        assert!(result.is_none());
    }
}
