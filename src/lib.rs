mod codec;
pub use codec::CommandCodec;
mod command;
pub use command::{CommandType, DpadKey, RemoteCommand};
mod error;
pub use error::RemoteError;
mod host;
pub use host::{AudioControl, KeySink, PlaybackHost, PlayerFacade, ScreenControl};
mod keys;
pub use keys::{KeyCode, KeyInjector, KeyStroke};
mod models;
pub use models::{PlaybackMode, PlayingSnapshot, StateSnapshot, SubtitleTrack, Video};
mod pairing;
pub use pairing::{PairingCode, PairingCodeCallback};
mod publisher;
use publisher::StatePublisher;
mod settings;
pub use settings::{SessionTimings, Settings, SETTINGS};
mod source;
pub use source::{framed_commands, CommandBus, CommandSource, CommandStream};
mod state;
pub use state::ControllerPhase;
use state::SessionState;
mod store;
pub use store::{MemorySessionStore, SessionStore};
mod transport;
pub use transport::StateTransport;
mod utils;
pub use utils::{display_language, language_matches};
mod volume;
use volume::VolumeWatcher;

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Everything the session core needs from its surroundings, bundled and
/// injected at construction. There is deliberately no global service
/// registry: hosts build one context and hand it over.
#[derive(Clone)]
pub struct SessionContext {
    pub source: Arc<dyn CommandSource>,
    pub transport: Arc<dyn StateTransport>,
    pub host: Arc<dyn PlaybackHost>,
    pub screen: Arc<dyn ScreenControl>,
    pub audio: Arc<dyn AudioControl>,
    pub keys: Arc<dyn KeySink>,
    pub store: Arc<dyn SessionStore>,
}

/// Device-side session manager for second-screen remote control.
///
/// A companion device drives local playback through an inbound command
/// stream; the controller dispatches each command to the playback host,
/// key injector or state publisher, and reports playback/volume state back
/// through the outbound transport. The hosting playback app calls the
/// `on_*` lifecycle hooks as its own events occur.
///
/// # Logging
///
/// This library uses the `tracing` crate for logging. To enable logs,
/// initialize a tracing subscriber in your application.
///
/// Example using `tracing_subscriber`:
/// ```no_run
/// use tracing::Level;
/// use tracing_subscriber::FmtSubscriber;
///
/// let subscriber = FmtSubscriber::builder()
///     .with_max_level(Level::DEBUG)
///     .finish();
///
/// tracing::subscriber::set_global_default(subscriber)
///     .expect("Failed to set tracing subscriber");
/// ```
pub struct RemoteController {
    inner: Arc<ControllerInner>,
    phase_rx: watch::Receiver<ControllerPhase>,
}

struct ControllerInner {
    ctx: SessionContext,
    timings: SessionTimings,
    session: Arc<Mutex<SessionState>>,
    publisher: Arc<StatePublisher>,
    watcher: VolumeWatcher,
    injector: KeyInjector,
    listen_task: Mutex<Option<JoinHandle<()>>>,
    foreground_retry: Mutex<Option<JoinHandle<()>>>,
    phase_tx: watch::Sender<ControllerPhase>,
}

impl RemoteController {
    /// Create a controller with the default timings from [`SETTINGS`].
    /// Listening does not start until one of the lifecycle triggers
    /// (`on_init`, `on_settings_changed`, `on_view_resumed`) fires.
    pub fn new(ctx: SessionContext) -> Self {
        Self::with_timings(ctx, SessionTimings::default())
    }

    pub fn with_timings(ctx: SessionContext, timings: SessionTimings) -> Self {
        let (phase_tx, phase_rx) = watch::channel(ControllerPhase::Idle);
        let session = Arc::new(Mutex::new(SessionState::default()));
        let publisher = Arc::new(StatePublisher::new(
            ctx.transport.clone(),
            ctx.store.clone(),
            ctx.host.clone(),
            session.clone(),
        ));
        let watcher = VolumeWatcher::new(
            ctx.audio.clone(),
            publisher.clone(),
            session.clone(),
            timings.volume_echo_window,
        );
        let injector = KeyInjector::new(ctx.keys.clone(), timings.key_hold_delay);

        Self {
            inner: Arc::new(ControllerInner {
                ctx,
                timings,
                session,
                publisher,
                watcher,
                injector,
                listen_task: Mutex::new(None),
                foreground_retry: Mutex::new(None),
                phase_tx,
            }),
            phase_rx,
        }
    }

    // --- Lifecycle hooks called by the hosting playback controller ---

    pub fn on_init(&self) {
        self.inner.try_listening();
    }

    pub fn on_settings_changed(&self) {
        self.inner.try_listening();
    }

    pub fn on_view_resumed(&self) {
        self.inner.try_listening();
    }

    /// A video is about to open; stamp it remote-originated while a
    /// companion is driving playback.
    pub fn on_video_opened(&self, video: &mut Video) {
        let connected = self.is_connected();
        debug!(video_id = %video.video_id, connected, "Video opened");
        video.is_remote = connected;
    }

    /// The video finished loading and playback is starting: apply any
    /// pending seek, announce the item, and remember it for resume.
    pub fn on_video_playback_started(&self, video: &Video) {
        let Some(player) = self.inner.ctx.host.player() else {
            return;
        };

        if let Some(position_ms) = self.inner.session.lock().unwrap().take_pending_seek() {
            debug!(position_ms, "Applying pending seek position");
            player.set_position_ms(position_ms);
        }

        self.inner
            .publisher
            .post_start_playing(self.inner.playing_snapshot(Some(video), player.play_when_ready()));

        if self.is_connected() {
            self.inner.ctx.store.set_last_video(video);
        }
    }

    pub fn on_play(&self) {
        self.inner.post_play(true);
    }

    pub fn on_pause(&self) {
        self.inner.post_play(false);
    }

    /// Current item finished. What the companion hears depends on the
    /// host's playback mode: repeat-one restarts, list modes stay silent
    /// because queue advance produces its own events.
    pub fn on_playback_ended(&self) {
        match self.inner.ctx.host.playback_mode() {
            PlaybackMode::Close | PlaybackMode::Pause | PlaybackMode::All => {
                self.inner.post_play(false);
            }
            PlaybackMode::One => {
                let video = self.inner.ctx.host.current_video();
                self.inner
                    .publisher
                    .post_start_playing(self.inner.playing_snapshot(video.as_ref(), true));
            }
            PlaybackMode::List | PlaybackMode::Shuffle => {}
        }
    }

    pub fn on_engine_released(&self) {
        self.inner.post_play(false);
    }

    /// Local user navigation detected: the companion no longer drives
    /// playback, but the subscription keeps running.
    pub fn on_user_navigated(&self) {
        debug!("User navigation detected, dropping connected flag");
        self.inner.session.lock().unwrap().connected = false;
        self.inner.publish_phase();
    }

    // --- Observability ---

    pub fn is_connected(&self) -> bool {
        self.inner.session.lock().unwrap().connected
    }

    /// Current phase of the controller.
    pub fn current_phase(&self) -> ControllerPhase {
        *self.phase_rx.borrow()
    }

    /// Watch channel for observing phase transitions.
    pub fn phase_updates(&self) -> watch::Receiver<ControllerPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Tear down the session: abort the subscription, all in-flight
    /// publishes, pending key and foreground timers, and the volume
    /// watcher. No scheduled work survives this call.
    pub fn shutdown(&self) {
        info!("Shutting down remote session controller");
        self.inner.stop_listening();
    }
}

impl std::fmt::Debug for RemoteController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteController")
            .field("phase", &*self.phase_rx.borrow())
            .field("connected", &self.is_connected())
            .finish()
    }
}

// Ensure the controller cancels its background work on drop
impl Drop for RemoteController {
    fn drop(&mut self) {
        debug!("Dropping RemoteController, cancelling scheduled work.");
        self.inner.stop_listening();
    }
}

impl ControllerInner {
    fn try_listening(self: &Arc<Self>) {
        if self.ctx.store.device_link_enabled() {
            self.start_listening();
        } else {
            self.stop_listening();
        }
    }

    /// Schedule the listen task. A re-trigger while one is pending or live
    /// is a no-op, so repeated lifecycle triggers never stack subscriptions.
    fn start_listening(self: &Arc<Self>) {
        let mut guard = self.listen_task.lock().unwrap();
        if guard.as_ref().is_some_and(|task| !task.is_finished()) {
            trace!("Listen task already scheduled or live");
            return;
        }

        let _ = self.phase_tx.send(ControllerPhase::Starting);
        let inner = self.clone();
        let session_id = Uuid::new_v4();
        debug!(%session_id, settle_delay = ?self.timings.settle_delay, "Scheduling command subscription");
        *guard = Some(tokio::spawn(async move {
            // Settle delay keeps the subscription from racing app startup.
            sleep(inner.timings.settle_delay).await;
            inner.listen_loop(session_id).await;
        }));
    }

    async fn listen_loop(self: Arc<Self>, session_id: Uuid) {
        info!(%session_id, "Subscribing to command stream");
        let mut stream = match self.ctx.source.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(%session_id, error = %e, "Command subscription failed");
                self.ctx
                    .screen
                    .show_notice(&format!("Remote control unavailable: {}", e));
                let _ = self.phase_tx.send(ControllerPhase::Idle);
                return;
            }
        };

        // Carry the connected flag across a re-subscription cycle.
        let connected = self.session.lock().unwrap().connected;
        let _ = self.phase_tx.send(if connected {
            ControllerPhase::Connected
        } else {
            ControllerPhase::Listening
        });

        while let Some(item) = stream.next().await {
            match item {
                Ok(command) => self.dispatch(command),
                Err(e) if e.ends_subscription() => {
                    // One-shot notice; re-subscription only happens on a
                    // future settings or lifecycle trigger.
                    error!(%session_id, error = %e, "Command stream failed");
                    self.ctx
                        .screen
                        .show_notice(&format!("Remote control error: {}", e));
                    let _ = self.phase_tx.send(ControllerPhase::Idle);
                    return;
                }
                Err(e) => {
                    warn!(%session_id, error = %e, "Transient command stream error");
                }
            }
        }

        // Shouldn't happen in a normal session, yet some transports do
        // close cleanly. Anomalous but non-fatal.
        debug!(%session_id, "Remote session stream completed");
        let _ = self.phase_tx.send(ControllerPhase::Idle);
    }

    fn stop_listening(&self) {
        if let Some(task) = self.listen_task.lock().unwrap().take() {
            debug!("Cancelling command subscription");
            task.abort();
        }
        self.publisher.cancel_all();
        self.injector.cancel_pending();
        if let Some(task) = self.foreground_retry.lock().unwrap().take() {
            task.abort();
        }
        self.watcher.unregister();
        let _ = self.phase_tx.send_replace(ControllerPhase::Idle);
    }

    // --- Command dispatch (serialized on the listen task) ---

    fn dispatch(self: &Arc<Self>, command: RemoteCommand) {
        if let Some(connected) = command.command_type.marks_connected() {
            self.session.lock().unwrap().connected = connected;
        }
        self.publish_phase();

        debug!(
            command = command.command_type.name(),
            connected = self.session.lock().unwrap().connected,
            "Dispatching command"
        );

        match command.command_type {
            CommandType::OpenVideo => self.handle_open_video(&command, false),
            CommandType::Subtitles => self.handle_open_video(&command, true),
            CommandType::UpdatePlaylist => self.handle_update_playlist(&command),
            CommandType::Seek => self.handle_seek(&command),
            CommandType::Play => self.handle_play_pause(true),
            CommandType::Pause => self.handle_play_pause(false),
            CommandType::Next => self.handle_advance(true),
            CommandType::Previous => self.handle_advance(false),
            CommandType::GetState => self.handle_get_state(),
            CommandType::Volume => self.handle_volume(&command),
            CommandType::Stop => self.handle_stop(),
            CommandType::Connected => self.handle_connected(),
            CommandType::Disconnected => self.handle_disconnected(&command),
            CommandType::Idle => self.handle_idle(),
            CommandType::Dpad => self.injector.press(command.key),
            CommandType::Voice => self.handle_voice(&command),
            CommandType::Undefined => {
                trace!("Ignoring undefined command");
            }
        }
    }

    fn handle_open_video(self: &Arc<Self>, command: &RemoteCommand, with_subtitles: bool) {
        if let Some(player) = self.ctx.host.player() {
            player.show_overlay(false);
        }
        self.move_playback_to_foreground();

        let new_video = Video::from_command(command);
        self.session
            .lock()
            .unwrap()
            .set_pending_seek(command.current_time_ms);

        if with_subtitles {
            self.apply_subtitles(command.subtitle_language_code.as_deref());
        }

        self.open_new_video(new_video);
    }

    /// Select the first subtitle track whose language label contains the
    /// requested code's display name. No code or no match disables both
    /// subtitle rendering and its toggle indicator.
    fn apply_subtitles(&self, language_code: Option<&str>) {
        let Some(player) = self.ctx.host.player() else {
            return;
        };

        let code = language_code.map(str::trim).filter(|c| !c.is_empty());
        let selected = code.and_then(|code| {
            player.subtitle_tracks().into_iter().find(|track| {
                track
                    .language
                    .as_deref()
                    .is_some_and(|language| language_matches(language, code))
            })
        });

        match selected {
            Some(track) => {
                debug!(track_id = track.id, "Selecting subtitle track");
                player.select_subtitle_track(&track);
                player.show_subtitles(true);
                player.set_subtitle_indicator(true);
            }
            None => {
                player.show_subtitles(false);
                player.set_subtitle_indicator(false);
            }
        }
    }

    fn handle_update_playlist(&self, command: &RemoteCommand) {
        let connected = self.session.lock().unwrap().connected;
        if !connected || self.ctx.host.player().is_none() {
            return;
        }
        // Only honored when the remote playlist is already playing
        if let Some(video) = self.ctx.host.current_video() {
            if video.playlist_id.is_some() {
                let updated = Video {
                    playlist_id: command.playlist_id.clone(),
                    playlist_params: None,
                    is_remote: true,
                    ..video
                };
                self.ctx.host.replace_current_video(updated);
            }
        }
    }

    fn handle_seek(self: &Arc<Self>, command: &RemoteCommand) {
        if let Some(player) = self.ctx.host.player() {
            player.show_overlay(false);
            self.move_playback_to_foreground();
            player.set_position_ms(command.current_time_ms);
            self.publisher.post_state_change(StateSnapshot {
                position_ms: command.current_time_ms,
                duration_ms: player.duration_ms(),
                is_playing: player.is_playing(),
            });
        } else {
            self.open_new_video(self.ctx.host.current_video());
        }
    }

    fn handle_play_pause(self: &Arc<Self>, play: bool) {
        if let Some(player) = self.ctx.host.player() {
            self.move_playback_to_foreground();
            player.set_play_when_ready(play);
            self.publisher.post_state_change(StateSnapshot {
                position_ms: player.position_ms(),
                duration_ms: player.duration_ms(),
                is_playing: play,
            });
        } else {
            // Companion expects playback to exist; bring back the current
            // video, or the last one we remembered.
            let target = self
                .ctx
                .host
                .current_video()
                .or_else(|| self.ctx.store.last_video());
            self.open_new_video(target);
        }
    }

    fn handle_advance(self: &Arc<Self>, forward: bool) {
        if self.ctx.host.has_session() {
            self.move_playback_to_foreground();
            if forward {
                self.ctx.host.advance_next();
            } else {
                self.ctx.host.advance_previous();
            }
        } else {
            self.open_new_video(self.ctx.host.current_video());
        }
    }

    fn handle_get_state(&self) {
        if let Some(player) = self.ctx.host.player() {
            self.ctx.screen.bring_app_to_foreground();
            let video = self.ctx.host.current_video();
            self.publisher
                .post_start_playing(self.playing_snapshot(video.as_ref(), player.is_playing()));
        } else {
            self.publisher.post_start_playing(PlayingSnapshot::idle());
        }
    }

    fn handle_volume(&self, command: &RemoteCommand) {
        // A delta means the companion used its hardware volume sliders.
        let target = match command.delta() {
            Some(delta) => self.ctx.audio.volume() + delta,
            None => command.volume,
        };

        self.ctx.audio.set_volume(target);
        self.session.lock().unwrap().stamp_volume_self_change();

        // The delta path reads back since set_volume may clamp at the ends.
        let published = match command.delta() {
            Some(_) => self.ctx.audio.volume(),
            None => target,
        };
        self.publisher.post_volume_change(published);
    }

    fn handle_stop(&self) {
        if let Some(player) = self.ctx.host.player() {
            debug!("Closing player on companion stop");
            player.close();
        }
    }

    fn handle_connected(&self) {
        self.watcher.register();
        self.ctx.store.set_connected_before(true);
    }

    fn handle_disconnected(&self, command: &RemoteCommand) {
        if self.ctx.store.finish_on_disconnect() {
            let device = command.device_name.as_deref().unwrap_or("Companion");
            self.ctx
                .screen
                .show_notice(&format!("{} disconnected", device));
            self.ctx.screen.finish_app();
        }
        self.watcher.unregister();
        self.ctx.store.set_connected_before(false);
    }

    fn handle_idle(&self) {
        // A Connected notification may have been missed; re-register the
        // watcher whenever this session was ever driven by a companion.
        if self.connected_now_or_before() {
            self.watcher.register();
        }
    }

    fn handle_voice(&self, command: &RemoteCommand) {
        if command.voice_started {
            self.ctx.screen.start_voice_search();
        } else {
            self.ctx.screen.stop_voice_search();
        }
    }

    // --- Shared helpers ---

    /// Open-video with resume dedup: re-sending the currently playing item
    /// while its UI is foregrounded must not restart playback, only apply
    /// the pending seek and re-announce the item.
    fn open_new_video(&self, new_video: Option<Video>) {
        let current = self.ctx.host.current_video();
        let same_item = matches!(
            (&current, &new_video),
            (Some(cur), Some(new)) if cur.same_item(new)
        );

        if same_item && self.ctx.screen.is_playback_foreground() {
            if let (Some(player), Some(current)) = (self.ctx.host.player(), current) {
                if let Some(position_ms) = self.session.lock().unwrap().take_pending_seek() {
                    player.set_position_ms(position_ms);
                }
                debug!(video_id = %current.video_id, "Resuming already playing video");
                self.publisher
                    .post_start_playing(self.playing_snapshot(Some(&current), player.is_playing()));
            }
        } else if let Some(mut video) = new_video {
            video.is_remote = true;
            self.ctx.host.open_video(video);
        } else {
            warn!("Open request carried no video and nothing is playing");
        }
    }

    fn move_playback_to_foreground(self: &Arc<Self>) {
        self.ctx.screen.bring_playback_to_foreground();

        // Device wake fix when the player isn't started yet or was closed:
        // retry once after a delay, cancel-before-replace.
        if self.ctx.host.player().is_none() {
            let screen = self.ctx.screen.clone();
            let delay = self.timings.foreground_retry_delay;
            let mut guard = self.foreground_retry.lock().unwrap();
            if let Some(prev) = guard.take() {
                prev.abort();
            }
            *guard = Some(tokio::spawn(async move {
                sleep(delay).await;
                screen.bring_playback_to_foreground();
            }));
        }
    }

    fn post_play(&self, playing: bool) {
        let Some(player) = self.ctx.host.player() else {
            return;
        };
        self.publisher.post_state_change(StateSnapshot {
            position_ms: player.position_ms(),
            duration_ms: player.duration_ms(),
            is_playing: playing,
        });
    }

    /// Start-playing snapshot in the shape the companion expects: positions
    /// are only meaningful with both a video and a player, `-1` otherwise.
    fn playing_snapshot(&self, video: Option<&Video>, is_playing: bool) -> PlayingSnapshot {
        match (video, self.ctx.host.player()) {
            (Some(video), Some(player)) => PlayingSnapshot {
                video_id: Some(video.video_id.clone()),
                position_ms: player.position_ms(),
                duration_ms: player.duration_ms(),
                is_playing,
            },
            _ => PlayingSnapshot {
                video_id: None,
                position_ms: -1,
                duration_ms: -1,
                is_playing,
            },
        }
    }

    fn connected_now_or_before(&self) -> bool {
        self.session.lock().unwrap().connected || self.ctx.store.connected_before()
    }

    /// Reflect the connected flag in the observable phase, but only while a
    /// subscription is actually live.
    fn publish_phase(&self) {
        let connected = self.session.lock().unwrap().connected;
        let next = if connected {
            ControllerPhase::Connected
        } else {
            ControllerPhase::Listening
        };
        let _ = self.phase_tx.send_if_modified(|prev| {
            if !matches!(
                *prev,
                ControllerPhase::Listening | ControllerPhase::Connected
            ) {
                return false;
            }
            if *prev != next {
                *prev = next;
                true
            } else {
                false
            }
        });
    }
}
