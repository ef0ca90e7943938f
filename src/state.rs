use std::time::Instant;

/// Observable phase of the controller, published over a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerPhase {
    /// No inbound subscription and none pending.
    #[default]
    Idle,
    /// Listen trigger fired; waiting out the settle delay.
    Starting,
    /// Subscribed, companion not actively driving playback.
    Listening,
    /// Subscribed and companion actively driving playback.
    Connected,
}

/// Mutable session facts shared between dispatch, lifecycle hooks, the
/// publisher gate and the volume watcher. Critical sections are a few loads
/// and stores, so a plain std `Mutex` is enough.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    /// True while the companion is actively driving playback.
    pub(crate) connected: bool,
    /// Position to apply once the next video reports loaded. Applied once,
    /// then cleared.
    pub(crate) pending_seek_ms: Option<i64>,
    /// When we last changed the system volume ourselves, for echo
    /// suppression in the volume watcher.
    pub(crate) last_volume_self_change: Option<Instant>,
}

impl SessionState {
    pub(crate) fn take_pending_seek(&mut self) -> Option<i64> {
        self.pending_seek_ms.take()
    }

    pub(crate) fn set_pending_seek(&mut self, position_ms: i64) {
        // Zero and negative wire values mean "start from the beginning".
        self.pending_seek_ms = if position_ms > 0 {
            Some(position_ms)
        } else {
            None
        };
    }

    pub(crate) fn stamp_volume_self_change(&mut self) {
        self.last_volume_self_change = Some(Instant::now());
    }
}
