use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::transport::StateTransport;

// Type alias for the optional callback receiving fetched pairing codes
pub type PairingCodeCallback = Option<Box<dyn Fn(&str) + Send + Sync + 'static>>;

/// Single-flight retrieval of the device pairing code.
///
/// The host shows the code on screen so a user can type it into the
/// companion. A new request aborts any fetch still in flight; fetch errors
/// are logged and dropped, the callback simply never fires.
pub struct PairingCode {
    transport: Arc<dyn StateTransport>,
    callback: Arc<Mutex<PairingCodeCallback>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PairingCode {
    pub fn new(transport: Arc<dyn StateTransport>) -> Self {
        Self {
            transport,
            callback: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    pub fn set_code_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.callback.lock().unwrap() = Some(Box::new(callback));
        debug!("Pairing code callback set.");
    }

    /// Fetch the pairing code, cancelling any fetch already in flight.
    pub fn request(&self) {
        let transport = self.transport.clone();
        let callback = self.callback.clone();
        let mut guard = self.task.lock().unwrap();
        if let Some(prev) = guard.take() {
            prev.abort();
        }
        *guard = Some(tokio::spawn(async move {
            match transport.fetch_pairing_code().await {
                Ok(code) => {
                    debug!("Pairing code fetched");
                    if let Some(ref cb) = *callback.lock().unwrap() {
                        cb(&code);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Pairing code fetch failed (discarded)");
                }
            }
        }));
    }

    /// Abort an in-flight fetch. Idempotent.
    pub fn cancel(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for PairingCode {
    fn drop(&mut self) {
        self.cancel();
    }
}
