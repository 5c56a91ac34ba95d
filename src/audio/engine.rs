use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("invalid audio url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("audio download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("could not decode audio: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),

    #[error("no audio output device: {0}")]
    Device(#[from] rodio::StreamError),
}

/// Outcome of an asynchronous load, reported once through `AudioEngine::poll`.
#[derive(Debug)]
pub enum LoadEvent {
    Ready,
    Failed(AudioError),
}

/// A single audio stream that can be loaded, started, paused and sought.
///
/// Only one resource is loaded at a time; `load` replaces whatever was there.
pub trait AudioEngine {
    /// Begin loading the resource at `url`. Fails immediately if the URL is
    /// unusable; download and decode problems are reported later by `poll`.
    fn load(&mut self, url: &str) -> Result<(), AudioError>;

    /// Report the completion of a pending load, if it finished since the last call.
    fn poll(&mut self) -> Option<LoadEvent>;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, to: Duration);

    /// Elapsed playback position.
    fn position(&self) -> Duration;

    /// Total length, once the resource has been decoded far enough to know it.
    fn duration(&self) -> Option<Duration>;

    /// True when a loaded resource has played out completely.
    fn finished(&self) -> bool;

    /// Drop the loaded resource and abandon any pending load.
    fn release(&mut self);
}
