use std::sync::Mutex;

use crate::models::Video;

/// Persistent session flags plus the single "last played video" fact.
/// Backed by whatever preference storage the host app uses.
pub trait SessionStore: Send + Sync {
    /// Master switch for the whole remote-control feature.
    fn device_link_enabled(&self) -> bool;
    /// Whether a companion has ever connected during this install.
    fn connected_before(&self) -> bool;
    fn set_connected_before(&self, connected: bool);
    /// Whether a companion disconnect should terminate the app.
    fn finish_on_disconnect(&self) -> bool;
    fn last_video(&self) -> Option<Video>;
    fn set_last_video(&self, video: &Video);
}

/// In-memory store, for tests and hosts without persistent preferences.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<StoreData>,
}

#[derive(Default)]
struct StoreData {
    device_link_enabled: bool,
    connected_before: bool,
    finish_on_disconnect: bool,
    last_video: Option<Video>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_link_enabled() -> Self {
        let store = Self::default();
        store.set_device_link_enabled(true);
        store
    }

    pub fn set_device_link_enabled(&self, enabled: bool) {
        self.inner.lock().unwrap().device_link_enabled = enabled;
    }

    pub fn set_finish_on_disconnect(&self, finish: bool) {
        self.inner.lock().unwrap().finish_on_disconnect = finish;
    }
}

impl SessionStore for MemorySessionStore {
    fn device_link_enabled(&self) -> bool {
        self.inner.lock().unwrap().device_link_enabled
    }

    fn connected_before(&self) -> bool {
        self.inner.lock().unwrap().connected_before
    }

    fn set_connected_before(&self, connected: bool) {
        self.inner.lock().unwrap().connected_before = connected;
    }

    fn finish_on_disconnect(&self) -> bool {
        self.inner.lock().unwrap().finish_on_disconnect
    }

    fn last_video(&self) -> Option<Video> {
        self.inner.lock().unwrap().last_video.clone()
    }

    fn set_last_video(&self, video: &Video) {
        self.inner.lock().unwrap().last_video = Some(video.clone());
    }
}
