//! Core of a terminal music library browser/player: filter expression
//! language, track metadata, and library indexing/playback selection.
//! Decoding audio, rendering a screen, reading key bindings, and talking to
//! audio devices are external collaborators, not part of this crate.

pub mod filter;
pub mod library;
pub mod logging;
pub mod playlist;
pub mod track;
pub mod unicode;
