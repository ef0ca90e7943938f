#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use remote_session_rs::{
    AudioControl, CommandBus, CommandSource, CommandStream, CommandType, ControllerPhase, KeySink,
    KeyStroke, MemorySessionStore, PlaybackHost, PlaybackMode, PlayerFacade, PlayingSnapshot,
    RemoteCommand, RemoteController, RemoteError, ScreenControl, SessionContext, SessionTimings,
    SessionStore, StateSnapshot, StateTransport, SubtitleTrack, Video,
};

/// Recording transport double. An optional delay keeps calls in flight long
/// enough for single-flight cancellation to be observable.
#[derive(Default)]
pub struct MockTransport {
    pub delay: Option<Duration>,
    pub start_playing: Mutex<Vec<PlayingSnapshot>>,
    pub state_changes: Mutex<Vec<StateSnapshot>>,
    pub volume_changes: Mutex<Vec<i32>>,
    pub pairing_code: Mutex<String>,
    pub fail_publishes: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    async fn settle(&self) -> Result<(), RemoteError> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(RemoteError::Publish("mock failure".to_string()));
        }
        Ok(())
    }

    pub fn start_playing(&self) -> Vec<PlayingSnapshot> {
        self.start_playing.lock().unwrap().clone()
    }

    pub fn state_changes(&self) -> Vec<StateSnapshot> {
        self.state_changes.lock().unwrap().clone()
    }

    pub fn volume_changes(&self) -> Vec<i32> {
        self.volume_changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateTransport for MockTransport {
    async fn post_start_playing(&self, snapshot: PlayingSnapshot) -> Result<(), RemoteError> {
        self.settle().await?;
        self.start_playing.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn post_state_change(&self, snapshot: StateSnapshot) -> Result<(), RemoteError> {
        self.settle().await?;
        self.state_changes.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn post_volume_change(&self, volume: i32) -> Result<(), RemoteError> {
        self.settle().await?;
        self.volume_changes.lock().unwrap().push(volume);
        Ok(())
    }

    async fn fetch_pairing_code(&self) -> Result<String, RemoteError> {
        self.settle().await?;
        Ok(self.pairing_code.lock().unwrap().clone())
    }
}

/// Player double with observable side effects.
#[derive(Default)]
pub struct MockPlayer {
    pub position_ms: Mutex<i64>,
    pub duration_ms: Mutex<i64>,
    pub playing: AtomicBool,
    pub play_when_ready: AtomicBool,
    pub tracks: Mutex<Vec<SubtitleTrack>>,
    pub selected_track: Mutex<Option<i32>>,
    pub subtitles_shown: Mutex<Option<bool>>,
    pub subtitle_indicator: Mutex<Option<bool>>,
    pub overlay_shown: Mutex<Option<bool>>,
    pub closed: AtomicBool,
}

impl MockPlayer {
    pub fn new(position_ms: i64, duration_ms: i64, playing: bool) -> Arc<Self> {
        let player = Self::default();
        *player.position_ms.lock().unwrap() = position_ms;
        *player.duration_ms.lock().unwrap() = duration_ms;
        player.playing.store(playing, Ordering::SeqCst);
        player.play_when_ready.store(playing, Ordering::SeqCst);
        Arc::new(player)
    }
}

impl PlayerFacade for MockPlayer {
    fn position_ms(&self) -> i64 {
        *self.position_ms.lock().unwrap()
    }

    fn duration_ms(&self) -> i64 {
        *self.duration_ms.lock().unwrap()
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn play_when_ready(&self) -> bool {
        self.play_when_ready.load(Ordering::SeqCst)
    }

    fn set_position_ms(&self, position_ms: i64) {
        *self.position_ms.lock().unwrap() = position_ms;
    }

    fn set_play_when_ready(&self, play: bool) {
        self.play_when_ready.store(play, Ordering::SeqCst);
        self.playing.store(play, Ordering::SeqCst);
    }

    fn subtitle_tracks(&self) -> Vec<SubtitleTrack> {
        self.tracks.lock().unwrap().clone()
    }

    fn select_subtitle_track(&self, track: &SubtitleTrack) {
        *self.selected_track.lock().unwrap() = Some(track.id);
    }

    fn show_subtitles(&self, visible: bool) {
        *self.subtitles_shown.lock().unwrap() = Some(visible);
    }

    fn set_subtitle_indicator(&self, enabled: bool) {
        *self.subtitle_indicator.lock().unwrap() = Some(enabled);
    }

    fn show_overlay(&self, visible: bool) {
        *self.overlay_shown.lock().unwrap() = Some(visible);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Playback host double.
#[derive(Default)]
pub struct MockHost {
    pub player: Mutex<Option<Arc<MockPlayer>>>,
    pub current: Mutex<Option<Video>>,
    pub opened: Mutex<Vec<Video>>,
    pub replaced: Mutex<Vec<Video>>,
    pub next_count: AtomicUsize,
    pub previous_count: AtomicUsize,
    pub mode: Mutex<PlaybackMode>,
    pub embedded: AtomicBool,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_player(&self, player: Option<Arc<MockPlayer>>) {
        *self.player.lock().unwrap() = player;
    }

    pub fn set_current(&self, video: Option<Video>) {
        *self.current.lock().unwrap() = video;
    }

    pub fn opened(&self) -> Vec<Video> {
        self.opened.lock().unwrap().clone()
    }
}

impl PlaybackHost for MockHost {
    fn player(&self) -> Option<Arc<dyn PlayerFacade>> {
        self.player
            .lock()
            .unwrap()
            .clone()
            .map(|player| player as Arc<dyn PlayerFacade>)
    }

    fn has_session(&self) -> bool {
        self.player.lock().unwrap().is_some()
    }

    fn current_video(&self) -> Option<Video> {
        self.current.lock().unwrap().clone()
    }

    fn open_video(&self, video: Video) {
        self.opened.lock().unwrap().push(video);
    }

    fn replace_current_video(&self, video: Video) {
        *self.current.lock().unwrap() = Some(video.clone());
        self.replaced.lock().unwrap().push(video);
    }

    fn advance_next(&self) {
        self.next_count.fetch_add(1, Ordering::SeqCst);
    }

    fn advance_previous(&self) {
        self.previous_count.fetch_add(1, Ordering::SeqCst);
    }

    fn playback_mode(&self) -> PlaybackMode {
        *self.mode.lock().unwrap()
    }

    fn is_embedded(&self) -> bool {
        self.embedded.load(Ordering::SeqCst)
    }
}

/// Screen/affordance double.
#[derive(Default)]
pub struct MockScreen {
    pub playback_foreground_calls: AtomicUsize,
    pub app_foreground_calls: AtomicUsize,
    pub playback_in_foreground: AtomicBool,
    pub notices: Mutex<Vec<String>>,
    pub finished: AtomicBool,
    pub voice_events: Mutex<Vec<bool>>,
}

impl MockScreen {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

impl ScreenControl for MockScreen {
    // Only records the request; the foreground flag is controlled by the
    // test, since a real window transition lands asynchronously.
    fn bring_playback_to_foreground(&self) {
        self.playback_foreground_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn bring_app_to_foreground(&self) {
        self.app_foreground_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn is_playback_foreground(&self) -> bool {
        self.playback_in_foreground.load(Ordering::SeqCst)
    }

    fn show_notice(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }

    fn finish_app(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    fn start_voice_search(&self) {
        self.voice_events.lock().unwrap().push(true);
    }

    fn stop_voice_search(&self) {
        self.voice_events.lock().unwrap().push(false);
    }
}

/// System volume double over a watch channel, clamped to 0..=100 the way a
/// real audio service would.
pub struct MockAudio {
    tx: watch::Sender<i32>,
    // Held so the channel never closes: `send` fails (and drops the value)
    // once every receiver is gone, and the watcher only subscribes later.
    _rx: watch::Receiver<i32>,
}

impl MockAudio {
    pub fn new(volume: i32) -> Arc<Self> {
        let (tx, _rx) = watch::channel(volume);
        Arc::new(Self { tx, _rx })
    }
}

impl AudioControl for MockAudio {
    fn volume(&self) -> i32 {
        *self.tx.borrow()
    }

    fn set_volume(&self, volume: i32) {
        // send (not send_if_modified): a real volume service notifies
        // observers even when the value is rewritten unchanged
        let _ = self.tx.send(volume.clamp(0, 100));
    }

    fn volume_updates(&self) -> watch::Receiver<i32> {
        self.tx.subscribe()
    }
}

#[derive(Default)]
pub struct MockKeys {
    pub strokes: Mutex<Vec<KeyStroke>>,
}

impl MockKeys {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn strokes(&self) -> Vec<KeyStroke> {
        self.strokes.lock().unwrap().clone()
    }
}

impl KeySink for MockKeys {
    fn send(&self, stroke: KeyStroke) {
        self.strokes.lock().unwrap().push(stroke);
    }
}

/// Source whose stream fails immediately, for the transport-error path.
pub struct FailingSource;

#[async_trait]
impl CommandSource for FailingSource {
    async fn subscribe(&self) -> Result<CommandStream, RemoteError> {
        Ok(Box::pin(futures::stream::iter(vec![Err(
            RemoteError::Stream("connection reset".to_string()),
        )])))
    }
}

/// Short timings so tests drive the real timers quickly.
pub fn test_timings() -> SessionTimings {
    SessionTimings {
        settle_delay: Duration::from_millis(20),
        key_hold_delay: Duration::from_millis(80),
        volume_echo_window: Duration::from_millis(100),
        foreground_retry_delay: Duration::from_millis(60),
    }
}

/// Full controller harness wired to mocks.
pub struct Harness {
    pub bus: Arc<CommandBus>,
    pub transport: Arc<MockTransport>,
    pub host: Arc<MockHost>,
    pub screen: Arc<MockScreen>,
    pub audio: Arc<MockAudio>,
    pub keys: Arc<MockKeys>,
    pub store: Arc<MemorySessionStore>,
    pub controller: RemoteController,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(MockTransport::new(), None)
    }

    pub fn with_transport(transport: Arc<MockTransport>) -> Self {
        Self::build(transport, None)
    }

    pub fn with_source(source: Arc<dyn CommandSource>) -> Self {
        Self::build(MockTransport::new(), Some(source))
    }

    fn build(transport: Arc<MockTransport>, source: Option<Arc<dyn CommandSource>>) -> Self {
        let bus = Arc::new(CommandBus::with_capacity(16));
        let host = MockHost::new();
        let screen = MockScreen::new();
        let audio = MockAudio::new(50);
        let keys = MockKeys::new();
        let store = Arc::new(MemorySessionStore::with_device_link_enabled());

        let ctx = SessionContext {
            source: source.unwrap_or_else(|| bus.clone() as Arc<dyn CommandSource>),
            transport: transport.clone() as Arc<dyn StateTransport>,
            host: host.clone() as Arc<dyn PlaybackHost>,
            screen: screen.clone() as Arc<dyn ScreenControl>,
            audio: audio.clone() as Arc<dyn AudioControl>,
            keys: keys.clone() as Arc<dyn KeySink>,
            store: store.clone() as Arc<dyn SessionStore>,
        };
        let controller = RemoteController::with_timings(ctx, test_timings());

        Self {
            bus,
            transport,
            host,
            screen,
            audio,
            keys,
            store,
            controller,
        }
    }

    /// Trigger listening and wait until the subscription is live.
    pub async fn start(&self) {
        self.controller.on_init();
        let mut phases = self.controller.phase_updates();
        timeout(
            Duration::from_secs(2),
            phases.wait_for(|phase| {
                matches!(
                    phase,
                    ControllerPhase::Listening | ControllerPhase::Connected
                )
            }),
        )
        .await
        .expect("subscription did not come up")
        .expect("phase channel closed");
    }

    /// Send one command and give the dispatch plus any spawned publishes
    /// time to land.
    pub async fn send(&self, command: RemoteCommand) {
        assert!(self.bus.send(command), "no live subscriber on the bus");
        sleep(Duration::from_millis(40)).await;
    }

    pub async fn send_type(&self, command_type: CommandType) {
        self.send(RemoteCommand::of(command_type)).await;
    }
}
