//! Playback controller: the one object that owns the audio session.
//!
//! Views and the MPRIS service never touch the engine directly; they call
//! into `Player` and observe it through `PlayerSnapshot`s and the
//! `NowPlayingSink`.

mod controller;
mod session;
mod snapshot;
mod tick;

pub use controller::{Player, PlayerError};
pub use snapshot::{NowPlaying, NowPlayingSink, PlaybackState, PlayerSnapshot};

#[cfg(test)]
mod tests;
