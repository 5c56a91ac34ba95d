use super::*;
use crate::audio::{AudioEngine, AudioError, LoadEvent};
use crate::catalog::{Catalog, CatalogError, Endpoint, Track};
use crate::config::PlaybackSettings;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct EngineState {
    loads: Vec<String>,
    releases: usize,
    seeks: Vec<Duration>,
    playing: bool,
    position: Duration,
    duration: Option<Duration>,
    finished: bool,
    reject_load: bool,
    pending_event: Option<LoadEvent>,
}

#[derive(Clone, Default)]
struct FakeEngine(Rc<RefCell<EngineState>>);

impl AudioEngine for FakeEngine {
    fn load(&mut self, url: &str) -> Result<(), AudioError> {
        let mut s = self.0.borrow_mut();
        if s.reject_load {
            return Err(AudioError::InvalidUrl {
                url: url.to_string(),
                reason: "rejected by test".to_string(),
            });
        }
        s.loads.push(url.to_string());
        s.position = Duration::ZERO;
        Ok(())
    }

    fn poll(&mut self) -> Option<LoadEvent> {
        self.0.borrow_mut().pending_event.take()
    }

    fn play(&mut self) {
        self.0.borrow_mut().playing = true;
    }

    fn pause(&mut self) {
        self.0.borrow_mut().playing = false;
    }

    fn seek(&mut self, to: Duration) {
        let mut s = self.0.borrow_mut();
        // Like a drained rodio sink: nothing left to seek in.
        if s.finished {
            return;
        }
        s.seeks.push(to);
        s.position = to;
    }

    fn position(&self) -> Duration {
        self.0.borrow().position
    }

    fn duration(&self) -> Option<Duration> {
        self.0.borrow().duration
    }

    fn finished(&self) -> bool {
        self.0.borrow().finished
    }

    fn release(&mut self) {
        let mut s = self.0.borrow_mut();
        s.releases += 1;
        s.duration = None;
        s.finished = false;
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Rc<RefCell<Vec<(Option<NowPlaying>, PlaybackState)>>>);

impl NowPlayingSink for RecordingSink {
    fn update(&self, now_playing: Option<&NowPlaying>, state: PlaybackState) {
        self.0.borrow_mut().push((now_playing.cloned(), state));
    }
}

struct FakeCatalog {
    lyrics: Mutex<Option<String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn answer_lyrics(&self, lyrics: Option<&str>) {
        *self.lyrics.lock().unwrap() = lyrics.map(str::to_string);
    }

    fn lyrics_requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Catalog for FakeCatalog {
    fn list(&self, _search: Option<&str>) -> Result<Vec<Track>, CatalogError> {
        Ok(Vec::new())
    }

    fn lyrics(&self, song_id: &str) -> Result<String, CatalogError> {
        self.requests.lock().unwrap().push(song_id.to_string());
        self.lyrics.lock().unwrap().clone().ok_or(CatalogError::Rejected {
            status: "error".to_string(),
        })
    }
}

struct Harness {
    player: Player<FakeEngine>,
    engine: FakeEngine,
    sink: RecordingSink,
    catalog: Arc<FakeCatalog>,
}

fn harness_with(settings: PlaybackSettings, lyrics: Option<&str>) -> Harness {
    let engine = FakeEngine::default();
    let sink = RecordingSink::default();
    let catalog = Arc::new(FakeCatalog {
        lyrics: Mutex::new(lyrics.map(str::to_string)),
        requests: Mutex::new(Vec::new()),
    });
    let player = Player::new(
        engine.clone(),
        catalog.clone(),
        Endpoint::new("http://host", "api.php"),
        Box::new(sink.clone()),
        &settings,
    );
    Harness {
        player,
        engine,
        sink,
        catalog,
    }
}

fn harness() -> Harness {
    harness_with(PlaybackSettings::default(), None)
}

fn abc() -> Vec<Track> {
    vec![
        Track::new("a", "Alpha", "X"),
        Track::new("b", "Beta", "Y"),
        Track::new("c", "Gamma", "Z"),
    ]
}

fn wait_for_lyrics(h: &mut Harness) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while h.player.snapshot().lyrics_pending && Instant::now() < deadline {
        h.player.poll(Instant::now());
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn play_sets_index_of_track_in_playlist() {
    let p = abc();
    for t in &p {
        let mut h = harness();
        h.player.play(t, &p).unwrap();
        assert_eq!(p[h.player.current_index()].id(), t.id());
        assert_eq!(h.player.current_track(), Some(t));
        assert!(h.player.is_playing());
        assert!(h.engine.0.borrow().playing);
    }
}

#[test]
fn play_loads_derived_audio_url() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[1], &p).unwrap();
    assert_eq!(h.engine.0.borrow().loads, vec!["http://host/songs/b.wav"]);
}

#[test]
fn play_track_missing_from_playlist_is_an_error() {
    let mut h = harness();
    let p = abc();
    let err = h
        .player
        .play(&Track::new("zz", "Nope", "Nobody"), &p)
        .unwrap_err();
    assert_eq!(
        err,
        PlayerError::TrackNotInPlaylist {
            id: "zz".to_string()
        }
    );
    assert!(h.player.current_track().is_none());
    assert!(h.engine.0.borrow().loads.is_empty());
}

#[test]
fn replaying_current_track_resumes_without_reload() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().position = Duration::from_secs(42);
    h.player.tick();
    h.player.toggle_play_pause();
    assert!(!h.player.is_playing());

    h.player.play(&p[0], &p).unwrap();
    assert!(h.player.is_playing());
    assert_eq!(h.player.current_time(), Duration::from_secs(42));
    assert_eq!(h.engine.0.borrow().loads.len(), 1);
}

#[test]
fn starting_a_new_track_tears_down_the_old_one() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().duration = Some(Duration::from_secs(200));
    h.player.tick();
    assert_eq!(h.player.duration(), Duration::from_secs(200));

    h.player.play(&p[2], &p).unwrap();
    // One release for the initial (empty) teardown, one for the swap.
    assert_eq!(h.engine.0.borrow().releases, 2);
    assert_eq!(h.player.duration(), Duration::ZERO);
    assert_eq!(h.player.snapshot().duration, None);
    assert_eq!(h.player.current_index(), 2);
}

#[test]
fn toggle_play_pause_without_session_is_noop() {
    let mut h = harness();
    h.player.toggle_play_pause();
    assert!(!h.player.is_playing());
    assert_eq!(h.player.state(), PlaybackState::Stopped);
    assert!(h.sink.0.borrow().is_empty());
}

#[test]
fn toggle_play_pause_flips_state_and_refreshes_metadata() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    let before = h.sink.0.borrow().len();

    h.player.toggle_play_pause();
    assert_eq!(h.player.state(), PlaybackState::Paused);
    assert!(!h.engine.0.borrow().playing);

    h.player.toggle_play_pause();
    assert_eq!(h.player.state(), PlaybackState::Playing);
    assert!(h.engine.0.borrow().playing);

    let updates = h.sink.0.borrow();
    assert_eq!(updates.len(), before + 2);
    assert_eq!(updates.last().unwrap().1, PlaybackState::Playing);
}

#[test]
fn seek_without_session_is_noop() {
    let mut h = harness();
    h.player.seek(Duration::from_secs(10));
    assert!(h.engine.0.borrow().seeks.is_empty());
    assert_eq!(h.player.current_time(), Duration::ZERO);
}

#[test]
fn seek_moves_engine_and_updates_time() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.seek(Duration::from_secs(30));
    assert_eq!(h.engine.0.borrow().seeks, vec![Duration::from_secs(30)]);
    assert_eq!(h.player.current_time(), Duration::from_secs(30));

    let updates = h.sink.0.borrow();
    let np = updates.last().unwrap().0.as_ref().unwrap();
    assert_eq!(np.elapsed, Duration::from_secs(30));
}

#[test]
fn seek_by_clamps_to_known_bounds() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().duration = Some(Duration::from_secs(60));
    h.engine.0.borrow_mut().position = Duration::from_secs(3);
    h.player.tick();

    h.player.seek_by(-5_000_000);
    assert_eq!(h.player.current_time(), Duration::ZERO);

    h.player.seek_by(100_000_000);
    assert_eq!(h.player.current_time(), Duration::from_secs(60));
}

#[test]
fn seek_by_keeps_sub_second_offsets() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().position = Duration::from_secs(3);
    h.player.tick();

    h.player.seek_by(500_000);
    assert_eq!(h.player.current_time(), Duration::from_millis(3_500));

    h.player.seek_by(-250_000);
    assert_eq!(h.player.current_time(), Duration::from_millis(3_250));
}

#[test]
fn toggle_repeat_twice_is_identity() {
    let mut h = harness();
    let start = h.player.repeat_enabled();
    h.player.toggle_repeat();
    assert_ne!(h.player.repeat_enabled(), start);
    h.player.toggle_repeat();
    assert_eq!(h.player.repeat_enabled(), start);
}

#[test]
fn navigation_on_empty_playlist_changes_nothing() {
    let mut h = harness();
    h.player.next_song();
    h.player.force_next_song();
    h.player.previous_song();
    assert!(h.player.current_track().is_none());
    assert_eq!(h.player.current_index(), 0);
    assert!(h.engine.0.borrow().loads.is_empty());
    assert!(h.sink.0.borrow().is_empty());
}

#[test]
fn navigation_always_stays_in_range() {
    let p = abc();
    for start in 0..p.len() {
        let mut h = harness();
        h.player.play(&p[start], &p).unwrap();
        for _ in 0..7 {
            h.player.next_song();
            assert!(h.player.current_index() < p.len());
            h.player.force_next_song();
            assert!(h.player.current_index() < p.len());
        }
        for _ in 0..7 {
            h.player.previous_song();
            assert!(h.player.current_index() < p.len());
        }
    }
}

#[test]
fn skip_forward_then_back_scenario() {
    let mut h = harness();
    let p = abc();

    h.player.play(&p[1], &p).unwrap();
    assert_eq!(h.player.current_index(), 1);

    h.player.force_next_song();
    assert_eq!(h.player.current_index(), 2);
    assert_eq!(h.player.current_track(), Some(&p[2]));

    h.player.previous_song();
    assert_eq!(h.player.current_index(), 1);
    assert_eq!(h.player.current_track(), Some(&p[1]));

    assert_eq!(
        h.engine.0.borrow().loads,
        vec![
            "http://host/songs/b.wav",
            "http://host/songs/c.wav",
            "http://host/songs/b.wav",
        ]
    );
}

#[test]
fn previous_wraps_to_last() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.previous_song();
    assert_eq!(h.player.current_index(), 2);
}

#[test]
fn next_song_with_repeat_reloads_current_track() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[1], &p).unwrap();
    h.player.toggle_repeat();

    h.player.next_song();
    assert_eq!(h.player.current_index(), 1);
    assert_eq!(h.engine.0.borrow().loads.len(), 2);
    assert_eq!(h.engine.0.borrow().loads[1], "http://host/songs/b.wav");

    // Forced skip ignores repeat.
    h.player.force_next_song();
    assert_eq!(h.player.current_index(), 2);
    assert!(h.player.repeat_enabled());
}

#[test]
fn tick_near_end_with_repeat_restarts_in_place() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[1], &p).unwrap();
    h.player.toggle_repeat();
    {
        let mut s = h.engine.0.borrow_mut();
        s.duration = Some(Duration::from_secs(180));
        s.position = Duration::from_millis(179_500);
    }

    h.player.tick();

    assert_eq!(h.player.current_index(), 1);
    assert_eq!(h.player.current_time(), Duration::ZERO);
    assert!(h.player.is_playing());
    let s = h.engine.0.borrow();
    assert_eq!(s.seeks, vec![Duration::ZERO]);
    assert_eq!(s.loads.len(), 1);
    assert!(s.playing);
}

#[test]
fn repeat_after_engine_drained_reloads_track() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[1], &p).unwrap();
    h.player.toggle_repeat();
    {
        let mut s = h.engine.0.borrow_mut();
        s.duration = Some(Duration::from_secs(180));
        s.position = Duration::from_secs(180);
        s.finished = true;
    }

    h.player.tick();

    assert_eq!(h.player.current_index(), 1);
    assert!(h.player.is_playing());
    assert_eq!(h.player.current_time(), Duration::ZERO);
    let s = h.engine.0.borrow();
    assert_eq!(
        s.loads,
        vec!["http://host/songs/b.wav", "http://host/songs/b.wav"]
    );
    assert!(!s.finished);
    assert!(s.playing);
}

#[test]
fn tick_near_end_without_repeat_advances_and_wraps() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[2], &p).unwrap();
    {
        let mut s = h.engine.0.borrow_mut();
        s.duration = Some(Duration::from_secs(180));
        s.position = Duration::from_millis(179_500);
    }

    h.player.tick();

    assert_eq!(h.player.current_index(), 0);
    assert_eq!(h.player.current_track(), Some(&p[0]));
    assert_eq!(h.engine.0.borrow().loads.last().unwrap(), "http://host/songs/a.wav");
}

#[test]
fn tick_does_not_end_track_while_duration_unknown() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().position = Duration::from_millis(100);

    h.player.tick();

    assert_eq!(h.player.current_index(), 0);
    assert_eq!(h.engine.0.borrow().loads.len(), 1);
    assert_eq!(h.player.current_time(), Duration::from_millis(100));
}

#[test]
fn tick_does_not_advance_while_paused() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.toggle_play_pause();
    {
        let mut s = h.engine.0.borrow_mut();
        s.duration = Some(Duration::from_secs(10));
        s.position = Duration::from_secs(10);
    }
    h.player.tick();
    assert_eq!(h.player.current_index(), 0);
}

#[test]
fn engine_finished_counts_as_end_of_track() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().finished = true;
    h.player.tick();
    assert_eq!(h.player.current_index(), 1);
}

#[test]
fn poll_runs_tick_once_interval_has_passed() {
    let mut h = harness_with(
        PlaybackSettings {
            tick_ms: 200,
            ..PlaybackSettings::default()
        },
        None,
    );
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().position = Duration::from_secs(5);

    h.player.poll(Instant::now());
    assert_eq!(h.player.current_time(), Duration::ZERO);

    h.player.poll(Instant::now() + Duration::from_millis(250));
    assert_eq!(h.player.current_time(), Duration::from_secs(5));
}

#[test]
fn invalid_audio_url_aborts_silently() {
    let mut h = harness();
    let p = abc();
    h.engine.0.borrow_mut().reject_load = true;

    h.player.play(&p[0], &p).unwrap();

    assert!(!h.player.is_playing());
    assert!(h.player.current_track().is_none());
    assert_eq!(h.player.state(), PlaybackState::Stopped);
}

#[test]
fn load_failure_leaves_player_not_playing() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.engine.0.borrow_mut().pending_event = Some(LoadEvent::Failed(AudioError::InvalidUrl {
        url: "x".to_string(),
        reason: "404".to_string(),
    }));

    h.player.poll(Instant::now());

    assert!(!h.player.is_playing());
    assert_eq!(h.player.current_track(), Some(&p[0]));

    // Resuming cannot bring it back to life.
    h.player.toggle_play_pause();
    assert!(!h.player.is_playing());

    // Selecting it again reloads.
    h.player.play(&p[0], &p).unwrap();
    assert!(h.player.is_playing());
    assert_eq!(h.engine.0.borrow().loads.len(), 2);
}

#[test]
fn load_ready_picks_up_duration() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    {
        let mut s = h.engine.0.borrow_mut();
        s.duration = Some(Duration::from_secs(90));
        s.pending_event = Some(LoadEvent::Ready);
    }
    h.player.poll(Instant::now());
    assert_eq!(h.player.snapshot().duration, Some(Duration::from_secs(90)));
}

#[test]
fn now_playing_tracks_session() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[1], &p).unwrap();
    h.engine.0.borrow_mut().duration = Some(Duration::from_secs(120));
    h.engine.0.borrow_mut().position = Duration::from_secs(7);
    h.player.tick();

    let updates = h.sink.0.borrow();
    let (np, state) = updates.last().unwrap();
    let np = np.as_ref().unwrap();
    assert_eq!(*state, PlaybackState::Playing);
    assert_eq!(np.title, "Beta");
    assert_eq!(np.artist, "Y");
    assert_eq!(np.duration, Some(Duration::from_secs(120)));
    assert_eq!(np.elapsed, Duration::from_secs(7));
    assert_eq!(
        np.artwork_url.as_deref(),
        Some("http://host/covers/b/maxresdefault.png")
    );
}

#[test]
fn stop_clears_session_and_now_playing() {
    let mut h = harness();
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.stop();

    assert!(h.player.current_track().is_none());
    assert!(h.player.playlist().is_empty());
    assert_eq!(h.player.state(), PlaybackState::Stopped);
    let updates = h.sink.0.borrow();
    assert_eq!(updates.last().unwrap(), &(None, PlaybackState::Stopped));
}

#[test]
fn subscribers_receive_snapshots() {
    let mut h = harness();
    let rx = h.player.subscribe();
    assert_eq!(rx.try_recv().unwrap(), PlayerSnapshot::default());

    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    let last = rx.try_iter().last().unwrap();
    assert_eq!(last.track, Some(p[0].clone()));
    assert_eq!(last.state, PlaybackState::Playing);
    assert_eq!(last.index, Some(0));
    assert_eq!(last.playlist_len, 3);
}

#[test]
fn dropped_subscriber_is_pruned() {
    let mut h = harness();
    let rx = h.player.subscribe();
    drop(rx);
    h.player.toggle_repeat();
    let rx2 = h.player.subscribe();
    h.player.toggle_repeat();
    assert_eq!(rx2.try_iter().count(), 2);
}

#[test]
fn fetch_lyrics_stores_text() {
    let mut h = harness_with(PlaybackSettings::default(), Some("la la la"));
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.fetch_lyrics("a");
    assert!(h.player.snapshot().lyrics_pending);

    wait_for_lyrics(&mut h);
    assert_eq!(h.player.lyrics_text(), Some("la la la"));
}

#[test]
fn failed_lyrics_fetch_keeps_prior_text() {
    let mut h = harness_with(PlaybackSettings::default(), Some("v1"));
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.fetch_lyrics("a");
    wait_for_lyrics(&mut h);
    assert_eq!(h.player.lyrics_text(), Some("v1"));

    h.catalog.answer_lyrics(None);
    h.player.fetch_lyrics("a");
    wait_for_lyrics(&mut h);
    assert_eq!(h.catalog.lyrics_requests(), vec!["a", "a"]);
    assert_eq!(h.player.lyrics_text(), Some("v1"));
    assert!(!h.player.snapshot().lyrics_pending);
}

#[test]
fn wanted_lyrics_are_refetched_when_same_track_reloads() {
    let mut h = harness_with(PlaybackSettings::default(), Some("words"));
    let p = vec![Track::new("a", "Alpha", "X")];
    h.player.play(&p[0], &p).unwrap();
    h.player.set_lyrics_wanted(true);
    wait_for_lyrics(&mut h);
    assert_eq!(h.player.lyrics_text(), Some("words"));

    h.player.force_next_song();
    assert_eq!(h.player.current_track(), Some(&p[0]));
    assert!(h.player.snapshot().lyrics_pending);

    wait_for_lyrics(&mut h);
    assert_eq!(h.player.lyrics_text(), Some("words"));
    assert_eq!(h.catalog.lyrics_requests(), vec!["a", "a"]);
}

#[test]
fn lyrics_are_not_fetched_unless_wanted() {
    let mut h = harness_with(PlaybackSettings::default(), Some("words"));
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.force_next_song();
    assert!(!h.player.snapshot().lyrics_pending);

    h.player.set_lyrics_wanted(true);
    assert!(h.player.snapshot().lyrics_pending);
    wait_for_lyrics(&mut h);
    assert_eq!(h.catalog.lyrics_requests(), vec!["b"]);

    // Present lyrics are not requested twice.
    h.player.set_lyrics_wanted(false);
    h.player.set_lyrics_wanted(true);
    assert!(!h.player.snapshot().lyrics_pending);
    assert_eq!(h.catalog.lyrics_requests(), vec!["b"]);
}

#[test]
fn lyrics_for_previous_track_are_discarded() {
    let mut h = harness_with(PlaybackSettings::default(), Some("old words"));
    let p = abc();
    h.player.play(&p[0], &p).unwrap();
    h.player.fetch_lyrics("a");
    h.player.force_next_song();
    assert!(!h.player.snapshot().lyrics_pending);

    std::thread::sleep(Duration::from_millis(50));
    h.player.poll(Instant::now());
    assert_eq!(h.player.lyrics_text(), None);
}

#[test]
fn repeat_setting_seeds_initial_mode() {
    let h = harness_with(
        PlaybackSettings {
            repeat: true,
            ..PlaybackSettings::default()
        },
        None,
    );
    assert!(h.player.repeat_enabled());
}
