use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::host::PlaybackHost;
use crate::models::{PlayingSnapshot, StateSnapshot};
use crate::state::SessionState;
use crate::store::SessionStore;
use crate::transport::StateTransport;

/// Single-flight outbound publisher: one live transport call per kind, a new
/// post of the same kind aborts the previous one first (last-write-wins, no
/// queue). Failures are logged and discarded, never retried.
///
/// Every post runs through the same gate: device-link must be enabled, the
/// session must be connected now or have been connected before, and embedded
/// playback surfaces never publish. Suppressed posts are silent no-ops.
pub(crate) struct StatePublisher {
    transport: Arc<dyn StateTransport>,
    store: Arc<dyn SessionStore>,
    host: Arc<dyn PlaybackHost>,
    session: Arc<Mutex<SessionState>>,
    start_playing_task: Mutex<Option<JoinHandle<()>>>,
    state_change_task: Mutex<Option<JoinHandle<()>>>,
    volume_change_task: Mutex<Option<JoinHandle<()>>>,
}

impl StatePublisher {
    pub(crate) fn new(
        transport: Arc<dyn StateTransport>,
        store: Arc<dyn SessionStore>,
        host: Arc<dyn PlaybackHost>,
        session: Arc<Mutex<SessionState>>,
    ) -> Self {
        Self {
            transport,
            store,
            host,
            session,
            start_playing_task: Mutex::new(None),
            state_change_task: Mutex::new(None),
            volume_change_task: Mutex::new(None),
        }
    }

    /// The three-condition suppression gate.
    fn publishing_allowed(&self) -> bool {
        if !self.store.device_link_enabled() {
            debug!("Publish suppressed: device link disabled");
            return false;
        }
        let connected = self.session.lock().unwrap().connected;
        if !connected && !self.store.connected_before() {
            debug!("Publish suppressed: never connected");
            return false;
        }
        if self.host.is_embedded() {
            debug!("Publish suppressed: embedded playback surface");
            return false;
        }
        true
    }

    pub(crate) fn post_start_playing(&self, snapshot: PlayingSnapshot) {
        if !self.publishing_allowed() {
            return;
        }
        let transport = self.transport.clone();
        single_flight(&self.start_playing_task, async move {
            debug!(video_id = ?snapshot.video_id, "Posting start-playing snapshot");
            if let Err(e) = transport.post_start_playing(snapshot).await {
                warn!(error = %e, "start-playing publish failed (discarded)");
            }
        });
    }

    pub(crate) fn post_state_change(&self, snapshot: StateSnapshot) {
        if !self.publishing_allowed() {
            return;
        }
        let transport = self.transport.clone();
        single_flight(&self.state_change_task, async move {
            debug!(
                position_ms = snapshot.position_ms,
                is_playing = snapshot.is_playing,
                "Posting state change"
            );
            if let Err(e) = transport.post_state_change(snapshot).await {
                warn!(error = %e, "state-change publish failed (discarded)");
            }
        });
    }

    pub(crate) fn post_volume_change(&self, volume: i32) {
        if !self.publishing_allowed() {
            return;
        }
        let transport = self.transport.clone();
        single_flight(&self.volume_change_task, async move {
            debug!(volume, "Posting volume change");
            if let Err(e) = transport.post_volume_change(volume).await {
                warn!(error = %e, "volume publish failed (discarded)");
            }
        });
    }

    /// Abort all outstanding publishes. Called on teardown.
    pub(crate) fn cancel_all(&self) {
        abort_task(&self.start_playing_task);
        abort_task(&self.state_change_task);
        abort_task(&self.volume_change_task);
    }
}

impl Drop for StatePublisher {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

// Cancel-before-replace on a per-kind slot, under the slot lock so the old
// task is always aborted before the replacement starts.
fn single_flight<F>(slot: &Mutex<Option<JoinHandle<()>>>, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut guard = slot.lock().unwrap();
    if let Some(prev) = guard.take() {
        prev.abort();
    }
    *guard = Some(tokio::spawn(fut));
}

fn abort_task(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(task) = slot.lock().unwrap().take() {
        task.abort();
    }
}
