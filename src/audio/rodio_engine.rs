use std::time::Duration;

use reqwest::blocking::Client;
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::inflight::Inflight;

use super::engine::{AudioEngine, AudioError, LoadEvent};
use super::sink::create_sink_at;

/// `rodio`-backed engine. The file is downloaded on a worker thread and
/// decoded into a sink on the caller's thread once it arrives.
pub struct RodioEngine {
    stream: OutputStream,
    http: Client,
    sink: Option<Sink>,
    total: Option<Duration>,
    download: Inflight<Result<Vec<u8>, reqwest::Error>>,
    // Transport intent, applied when a pending download lands.
    playing: bool,
    start_at: Duration,
}

impl RodioEngine {
    pub fn new(http: Client) -> Result<Self, AudioError> {
        let mut stream = OutputStreamBuilder::open_default_stream()?;
        // rodio logs to stderr when OutputStream is dropped, which garbles the TUI.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            http,
            sink: None,
            total: None,
            download: Inflight::new(),
            playing: false,
            start_at: Duration::ZERO,
        })
    }
}

pub(super) fn check_url(url: &str) -> Result<(), AudioError> {
    let invalid = |reason: String| AudioError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = reqwest::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

fn download(http: &Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let bytes = http.get(url).send()?.error_for_status()?.bytes()?;
    log::debug!("downloaded {} bytes from {url}", bytes.len());
    Ok(bytes.to_vec())
}

impl AudioEngine for RodioEngine {
    fn load(&mut self, url: &str) -> Result<(), AudioError> {
        check_url(url)?;
        self.release();

        let http = self.http.clone();
        let url = url.to_string();
        self.download.spawn(move || download(&http, &url));
        Ok(())
    }

    fn poll(&mut self) -> Option<LoadEvent> {
        let bytes = match self.download.poll()? {
            Ok(bytes) => bytes,
            Err(e) => return Some(LoadEvent::Failed(e.into())),
        };

        match create_sink_at(&self.stream, bytes, self.start_at) {
            Ok((sink, total)) => {
                if self.playing {
                    sink.play();
                }
                self.sink = Some(sink);
                self.total = total;
                Some(LoadEvent::Ready)
            }
            Err(e) => Some(LoadEvent::Failed(e)),
        }
    }

    fn play(&mut self) {
        self.playing = true;
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        self.playing = false;
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn seek(&mut self, to: Duration) {
        match &self.sink {
            Some(sink) => {
                if let Err(e) = sink.try_seek(to) {
                    log::warn!("seek to {to:?} failed: {e}");
                }
            }
            None => self.start_at = to,
        }
    }

    fn position(&self) -> Duration {
        match &self.sink {
            Some(sink) => sink.get_pos(),
            None => self.start_at,
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.total
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.empty())
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.download.cancel();
        self.total = None;
        self.playing = false;
        self.start_at = Duration::ZERO;
    }
}
