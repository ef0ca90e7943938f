use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, trace};

use crate::command::DpadKey;
use crate::host::KeySink;

/// Platform key codes for the six logical keys the protocol carries.
/// Raw values match the Android KeyEvent codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Back = 4,
    DpadUp = 19,
    DpadDown = 20,
    DpadLeft = 21,
    DpadRight = 22,
    DpadCenter = 23,
}

impl KeyCode {
    /// Translate a protocol key. Unmapped keys yield `None` and are dropped
    /// by the caller without any effect.
    pub fn from_dpad(key: DpadKey) -> Option<Self> {
        match key {
            DpadKey::Up => Some(KeyCode::DpadUp),
            DpadKey::Down => Some(KeyCode::DpadDown),
            DpadKey::Left => Some(KeyCode::DpadLeft),
            DpadKey::Right => Some(KeyCode::DpadRight),
            DpadKey::Enter => Some(KeyCode::DpadCenter),
            DpadKey::Back => Some(KeyCode::Back),
            DpadKey::Unknown => None,
        }
    }

    /// Left/right drive fast seeking, so they get hold emulation.
    pub fn supports_hold(self) -> bool {
        matches!(self, KeyCode::DpadLeft | KeyCode::DpadRight)
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A synthesized key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStroke {
    /// Key pressed, release pending.
    Down(KeyCode),
    /// Matching release for an earlier `Down`.
    Up(KeyCode),
    /// Discrete press-and-release in one event.
    Tap(KeyCode),
}

/// Translates directional commands into key events, emulating press-and-hold
/// for fast-seek keys with a delayed, cancellable release.
///
/// Only the latest hold is honored: a new press always cancels the previous
/// down/up pair first, so directional commands arriving faster than the hold
/// window can never produce a stuck key or a duplicate release.
pub struct KeyInjector {
    sink: Arc<dyn KeySink>,
    hold_delay: Duration,
    down_task: Mutex<Option<JoinHandle<()>>>,
    up_task: Mutex<Option<JoinHandle<()>>>,
}

impl KeyInjector {
    pub fn new(sink: Arc<dyn KeySink>, hold_delay: Duration) -> Self {
        Self {
            sink,
            hold_delay,
            down_task: Mutex::new(None),
            up_task: Mutex::new(None),
        }
    }

    /// Inject the key for a directional command. Unmapped keys are dropped
    /// silently.
    pub fn press(&self, key: DpadKey) {
        let Some(code) = KeyCode::from_dpad(key) else {
            trace!(?key, "Dropping unmapped directional key");
            return;
        };

        self.cancel_pending();

        if code.supports_hold() {
            debug!(code = code.code(), "Injecting held key press");
            let sink = self.sink.clone();
            let down = tokio::spawn(async move {
                sink.send(KeyStroke::Down(code));
            });
            let sink = self.sink.clone();
            let hold_delay = self.hold_delay;
            let up = tokio::spawn(async move {
                sleep(hold_delay).await;
                sink.send(KeyStroke::Up(code));
            });
            *self.down_task.lock().unwrap() = Some(down);
            *self.up_task.lock().unwrap() = Some(up);
        } else {
            debug!(code = code.code(), "Injecting key tap");
            let sink = self.sink.clone();
            let down = tokio::spawn(async move {
                sink.send(KeyStroke::Tap(code));
            });
            *self.down_task.lock().unwrap() = Some(down);
        }
    }

    /// Abort any scheduled down/up pair. Idempotent.
    pub fn cancel_pending(&self) {
        if let Some(task) = self.down_task.lock().unwrap().take() {
            task.abort();
        }
        if let Some(task) = self.up_task.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for KeyInjector {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
