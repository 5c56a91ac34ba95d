//! MPRIS service: the desktop's now-playing surface and media-key source.
//!
//! The service lives on its own thread. Player state reaches it through a
//! mutex-guarded snapshot; media-key intents come back to the main loop as
//! `ControlCmd`s.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::player::{NowPlaying, NowPlayingSink, PlaybackState};

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.cadenza";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative seek in microseconds.
    SeekBy(i64),
    /// Absolute position in microseconds.
    SetPosition(i64),
}

#[derive(Debug, Default, Clone, PartialEq)]
struct SharedState {
    playback: PlaybackState,
    title: Option<String>,
    artist: Vec<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    track_id: Option<OwnedObjectPath>,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

fn micros(d: Duration) -> i64 {
    i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

/// Object path for a track id; characters D-Bus forbids become `_`.
fn track_path(id: &str) -> Option<OwnedObjectPath> {
    let safe: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let safe = if safe.is_empty() { "_".to_string() } else { safe };
    OwnedObjectPath::try_from(format!("{OBJECT_PATH}/track/{safe}")).ok()
}

impl MprisHandle {
    fn apply(&self, now_playing: Option<&NowPlaying>, playback: PlaybackState) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        let before = s.clone();

        s.playback = playback;
        match now_playing {
            Some(np) => {
                s.title = Some(np.title.clone());
                s.artist = vec![np.artist.clone()];
                s.url = Some(np.audio_url.clone());
                s.art_url = np.artwork_url.clone();
                s.length_micros = np.duration.map(micros);
                s.position_micros = micros(np.elapsed);
                s.track_id = track_path(&np.track_id);
            }
            None => *s = SharedState::default(),
        }

        // Position is polled by clients; only signal the properties that emit.
        let signal = before.playback != s.playback
            || before.title != s.title
            || before.artist != s.artist
            || before.art_url != s.art_url
            || before.length_micros != s.length_micros
            || before.track_id != s.track_id;
        drop(s);

        if signal {
            let _ = self.notify.send(());
        }
    }
}

impl NowPlayingSink for MprisHandle {
    fn update(&self, now_playing: Option<&NowPlaying>, state: PlaybackState) {
        self.apply(now_playing, state);
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "cadenza"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::SeekBy(offset));
    }

    fn set_position(&self, track_id: ObjectPath<'_>, position: i64) {
        // Requests for a track that is no longer current are ignored.
        let current = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.track_id.clone());
        if current.as_ref().map(|p| p.as_str()) == Some(track_id.as_str()) && position >= 0 {
            let _ = self.tx.send(ControlCmd::SetPosition(position));
        }
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.playback {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let mut insert = |key: &str, value: Option<OwnedValue>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };

        let track_id = s
            .track_id
            .clone()
            .or_else(|| OwnedObjectPath::try_from("/org/mpris/MediaPlayer2/TrackList/NoTrack").ok());
        insert(
            "mpris:trackid",
            track_id.and_then(|p| owned(Value::from(p.into_inner()))),
        );
        insert(
            "xesam:title",
            owned(Value::from(s.title.clone().unwrap_or_default())),
        );
        if !s.artist.is_empty() {
            insert("xesam:artist", owned(Value::from(s.artist.clone())));
        }
        if let Some(url) = &s.url {
            insert("xesam:url", owned(Value::from(url.clone())));
        }
        if let Some(art) = &s.art_url {
            insert("mpris:artUrl", owned(Value::from(art.clone())));
        }
        if let Some(len) = s.length_micros {
            insert("mpris:length", owned(Value::from(len)));
        }
        map
    }
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify_rx: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;

    let player = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;
    log::info!("MPRIS service registered as {BUS_NAME}");

    loop {
        Timer::after(Duration::from_millis(200)).await;

        let mut dirty = false;
        loop {
            match notify_rx.try_recv() {
                Ok(()) => dirty = true,
                Err(TryRecvError::Empty) => break,
                // The player went away; the app is shutting down.
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        if dirty {
            let iface = player.get().await;
            let emitter = player.signal_emitter();
            iface.playback_status_changed(emitter).await?;
            iface.metadata_changed(emitter).await?;
        }
    }
}

pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
            log::warn!("MPRIS unavailable: {e}");
        }
    });

    MprisHandle { state, notify }
}
