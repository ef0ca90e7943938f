use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{PlayingSnapshot, StateSnapshot};

/// Outbound side of the session protocol: how device state reaches the
/// companion. One implementation per transport (HTTP long-poll backend,
/// local socket, test double); the core never creates connections itself.
///
/// Calls are fire-and-forget from the publisher's point of view: failures
/// are logged and discarded, never retried.
#[async_trait]
pub trait StateTransport: Send + Sync {
    /// Full "now playing" snapshot, sent when a video starts or when the
    /// companion asks for state.
    async fn post_start_playing(&self, snapshot: PlayingSnapshot) -> Result<(), RemoteError>;

    /// Incremental position/play-state update.
    async fn post_state_change(&self, snapshot: StateSnapshot) -> Result<(), RemoteError>;

    /// Current device volume, either echoing a remote change or reporting
    /// a local one.
    async fn post_volume_change(&self, volume: i32) -> Result<(), RemoteError>;

    /// Fetch the pairing code a user types into the companion to link this
    /// device.
    async fn fetch_pairing_code(&self) -> Result<String, RemoteError>;
}
