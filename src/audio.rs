//! Audio output.
//!
//! `AudioEngine` is the seam the playback controller drives; `RodioEngine`
//! is the production implementation that streams tracks over HTTP into a
//! `rodio` sink.

mod engine;
mod rodio_engine;
mod sink;

pub use engine::{AudioEngine, AudioError, LoadEvent};
pub use rodio_engine::RodioEngine;
