//! Utilities for creating `rodio` sinks from downloaded audio.
//!
//! The helper here decodes an in-memory file and prepares a paused `Sink`
//! at the requested start position.

use std::io::Cursor;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use super::engine::AudioError;

/// Create a paused `Sink` for `bytes` that starts playback at `start_at`.
///
/// Also returns the decoded length when the container reports it.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    bytes: Vec<u8>,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), AudioError> {
    let source = Decoder::new(Cursor::new(bytes))?;
    let total = source.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();

    if !start_at.is_zero() {
        if let Err(e) = sink.try_seek(start_at) {
            log::warn!("could not seek new sink to {start_at:?}: {e}");
        }
    }

    Ok((sink, total))
}
