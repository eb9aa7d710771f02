//! Thin CLI exerciser for the library core: scan a directory into bare
//! locators, load/save a playlist, and drive filter/sort/shuffle/playback
//! commands. Everything that would read real tag metadata, render a
//! screen, or talk to an audio device is an external collaborator this
//! binary never touches. Grounded on `ompl/src/main.rs`'s `Parser`/
//! `Subcommand` derive shape and custom `value_parser` functions, scaled
//! down from its TCP client/server split to a single-process exerciser.

#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use melodist::library::playback::{Scope, ShuffleMode};
use melodist::library::{Library, View};
use melodist::playlist;
use melodist::track::{Locator, Track};

/// Parse a `field` or `-field` sort-key token list into the raw string
/// `Library::set_sort` expects, validating nothing further here since the
/// library itself owns the field-name table.
fn parse_scope(s: &str) -> Result<Scope, String> {
    match s {
        "all" => Ok(Scope::All),
        "artist" => Ok(Scope::Artist),
        "album" => Ok(Scope::Album),
        other => Err(format!("unknown scope \"{other}\", expected all/artist/album")),
    }
}

fn parse_shuffle_mode(s: &str) -> Result<ShuffleMode, String> {
    match s {
        "none" => Ok(ShuffleMode::None),
        "tracks" => Ok(ShuffleMode::Tracks),
        "albums" => Ok(ShuffleMode::Albums),
        other => Err(format!("unknown shuffle mode \"{other}\", expected none/tracks/albums")),
    }
}

#[derive(Parser, Debug)]
#[command(name = "melodist", about = "Filter-expression music library core, exercised from the command line")]
struct Args {
    /// Playlist file to load at startup. Defaults to the configuration
    /// directory's `lib.pl`, per spec §6.
    #[arg(long)]
    playlist: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Walk DIR for files and add each as a bare track (filename stem as
    /// its title — no tag reader is in scope).
    Scan {
        dir: PathBuf,
        #[arg(long)]
        hidden: bool,
    },
    /// Save the current view's tracks as a playlist file.
    Save {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Set (or clear, with no argument) the view-filter.
    Filter { expr: Option<String> },
    /// Set (or clear) the live free-text filter.
    LiveFilter { text: Option<String> },
    /// Set (or clear) the add-filter.
    AddFilter { expr: Option<String> },
    /// Set the sort-key list, e.g. `artist album -tracknumber`.
    Sort { keys: String },
    /// Set the shuffle mode: none, tracks, or albums.
    Shuffle {
        #[arg(value_parser = parse_shuffle_mode)]
        mode: ShuffleMode,
    },
    /// Set the playback scope: all, artist, or album.
    Scope {
        #[arg(value_parser = parse_scope)]
        scope: Scope,
    },
    /// Toggle repeat on/off.
    Repeat { on: bool },
    /// Reshuffle the track ordering.
    ReshuffleTracks,
    /// Reshuffle the album ordering.
    ReshuffleAlbums,
    /// Advance to the next track and print it.
    Next,
    /// Step back to the previous track and print it.
    Prev,
    /// Skip to the next album and print its first track.
    NextAlbum,
    /// Skip to the previous album and print its last track.
    PrevAlbum,
    /// Print the currently selected track, if any.
    Current,
    /// Print every track in the requested view, in its own order.
    List {
        #[arg(long, default_value = "tree")]
        view: String,
    },
}

fn build_library(playlist_path: &Option<PathBuf>) -> Arc<Library> {
    let lib = Library::new();
    let path = playlist_path.clone().unwrap_or_else(playlist::default_path);
    match playlist::load(&path) {
        Ok(locators) => {
            for locator in locators {
                let mut track = Track::new(locator.clone());
                let title = locator.basename().unwrap_or_else(|| locator.display().into_owned());
                track.attach_comments(vec![("title".to_string(), title)]);
                let _ = lib.add(track);
            }
        }
        Err(e) => eprintln!("note: could not load playlist at {}: {e}", path.display()),
    }
    lib
}

fn print_track(track: &Track) {
    println!(
        "{} - {} - {} ({})",
        track.artist().unwrap_or("?"),
        track.album().unwrap_or("?"),
        track.title().unwrap_or("?"),
        track.locator().display(),
    );
}

fn main() {
    let args = Args::parse();
    let lib = build_library(&args.playlist);

    match args.action {
        Action::Scan { dir, hidden } => {
            let mut count = 0;
            for entry in walkdir::WalkDir::new(&dir).into_iter().filter_map(|e| e.ok()) {
                if !hidden && entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                let title = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
                let mut track = Track::new(Locator::Path(path));
                track.attach_comments(vec![("title".to_string(), title)]);
                if matches!(lib.add(track), Ok(melodist::library::AddOutcome::Inserted)) {
                    count += 1;
                }
            }
            println!("Added {count} tracks from {}", dir.display());
        }
        Action::Save { path } => {
            let path = path.unwrap_or_else(playlist::default_path);
            let mut locators = Vec::new();
            lib.iterate(View::Tree, |t| locators.push(t.locator().clone()));
            match playlist::save(&path, locators.iter()) {
                Ok(()) => println!("Saved {} tracks to {}", locators.len(), path.display()),
                Err(e) => eprintln!("error saving playlist: {e}"),
            }
        }
        Action::Filter { expr } => match lib.set_view_filter(expr.as_deref()) {
            Ok(()) => println!("{} tracks visible", lib.len()),
            Err(e) => eprintln!("filter error: {e}"),
        },
        Action::LiveFilter { text } => match lib.set_live_filter(text.as_deref()) {
            Ok(()) => println!("{} tracks visible", lib.len()),
            Err(e) => eprintln!("filter error: {e}"),
        },
        Action::AddFilter { expr } => match lib.set_add_filter(expr.as_deref()) {
            Ok(()) => println!("add-filter updated"),
            Err(e) => eprintln!("filter error: {e}"),
        },
        Action::Sort { keys } => {
            lib.set_sort(&keys);
            println!("sort keys set to \"{keys}\"");
        }
        Action::Shuffle { mode } => {
            lib.shuffle_mode_set(mode);
            println!("shuffle mode set");
        }
        Action::Scope { scope } => {
            lib.scope_set(scope);
            println!("scope set");
        }
        Action::Repeat { on } => {
            lib.repeat_set(on);
            println!("repeat: {on}");
        }
        Action::ReshuffleTracks => {
            lib.reshuffle_tracks();
            println!("track shuffle reseeded");
        }
        Action::ReshuffleAlbums => {
            lib.reshuffle_albums();
            println!("album shuffle reseeded");
        }
        Action::Next => {
            lib.next();
            match lib.current() {
                Some(t) => print_track(&t),
                None => println!("(nothing playing)"),
            }
        }
        Action::Prev => {
            lib.prev();
            match lib.current() {
                Some(t) => print_track(&t),
                None => println!("(nothing playing)"),
            }
        }
        Action::NextAlbum => {
            lib.next_album();
            match lib.current() {
                Some(t) => print_track(&t),
                None => println!("(nothing playing)"),
            }
        }
        Action::PrevAlbum => {
            lib.prev_album();
            match lib.current() {
                Some(t) => print_track(&t),
                None => println!("(nothing playing)"),
            }
        }
        Action::Current => match lib.current() {
            Some(t) => print_track(&t),
            None => println!("(nothing playing)"),
        },
        Action::List { view } => {
            let view = match view.as_str() {
                "list" | "editable" | "editable-list" => View::EditableList,
                _ => View::Tree,
            };
            lib.iterate(view, |t| print_track(t));
        }
    }
}
