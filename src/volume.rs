use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::host::AudioControl;
use crate::publisher::StatePublisher;
use crate::state::SessionState;

/// Watches local volume changes and reports them to the companion,
/// suppressing echoes of remote-initiated changes.
///
/// A change is an echo when it lands within the echo window of the last
/// self-initiated volume write. The window is wall-clock based and
/// best-effort: a publish slower than the window can still echo, which is
/// accepted behavior.
pub(crate) struct VolumeWatcher {
    audio: Arc<dyn AudioControl>,
    publisher: Arc<StatePublisher>,
    session: Arc<Mutex<SessionState>>,
    echo_window: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl VolumeWatcher {
    pub(crate) fn new(
        audio: Arc<dyn AudioControl>,
        publisher: Arc<StatePublisher>,
        session: Arc<Mutex<SessionState>>,
        echo_window: Duration,
    ) -> Self {
        Self {
            audio,
            publisher,
            session,
            echo_window,
            task: Mutex::new(None),
        }
    }

    /// Start watching. No-op while a watcher task is already live. Publishes
    /// the current volume once as an initial sync.
    pub(crate) fn register(&self) {
        let mut guard = self.task.lock().unwrap();
        if guard.as_ref().is_some_and(|task| !task.is_finished()) {
            trace!("Volume watcher already registered");
            return;
        }

        debug!("Registering volume watcher");
        self.publisher.post_volume_change(self.audio.volume());

        let mut updates = self.audio.volume_updates();
        let publisher = self.publisher.clone();
        let session = self.session.clone();
        let echo_window = self.echo_window;
        *guard = Some(tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let volume = *updates.borrow_and_update();
                let self_changed_recently = {
                    let state = session.lock().unwrap();
                    state
                        .last_volume_self_change
                        .is_some_and(|at| at.elapsed() <= echo_window)
                };
                if self_changed_recently {
                    trace!(volume, "Suppressing volume echo");
                } else {
                    debug!(volume, "Local volume change detected");
                    publisher.post_volume_change(volume);
                }
            }
            debug!("Volume update feed closed");
        }));
    }

    /// Stop watching. Idempotent; safe when never registered.
    pub(crate) fn unregister(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            debug!("Unregistering volume watcher");
            task.abort();
        }
    }
}

impl Drop for VolumeWatcher {
    fn drop(&mut self) {
        self.unregister();
    }
}
