use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::sync::broadcast;
use tokio_util::codec::FramedRead;
use tracing::warn;

use crate::codec::CommandCodec;
use crate::command::RemoteCommand;
use crate::error::RemoteError;
use crate::settings::SETTINGS;

/// Lazy, unbounded sequence of inbound commands. Ends only on explicit close
/// or transport error.
pub type CommandStream = Pin<Box<dyn Stream<Item = Result<RemoteCommand, RemoteError>> + Send>>;

/// Source of inbound companion commands. Restartable: each `subscribe` call
/// yields a fresh stream picking up from the current point in time.
#[async_trait]
pub trait CommandSource: Send + Sync {
    async fn subscribe(&self) -> Result<CommandStream, RemoteError>;
}

/// In-process command source backed by a broadcast channel.
///
/// The transport side pushes decoded commands in with [`CommandBus::send`];
/// the controller subscribes. Slow-consumer lag drops the oldest commands
/// with a warning rather than stalling the sender.
pub struct CommandBus {
    tx: broadcast::Sender<RemoteCommand>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        Self::with_capacity(SETTINGS.command_buffer_capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Push a command to all live subscribers. Returns false when nobody is
    /// listening (the command is dropped, matching an unsubscribed device).
    pub fn send(&self, command: RemoteCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl CommandSource for CommandBus {
    async fn subscribe(&self) -> Result<CommandStream, RemoteError> {
        let rx = self.tx.subscribe();
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(command) => return Some((Ok(command), rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Command stream lagged, dropping oldest commands");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

/// Adapt any byte stream carrying `<len>\n<json>` frames into a command
/// stream. Frames that fail JSON decoding are dropped silently (one warn
/// log), matching the malformed-command policy; I/O errors end the stream.
pub fn framed_commands<R>(reader: R) -> CommandStream
where
    R: AsyncRead + Send + 'static,
{
    let framed = FramedRead::new(reader, CommandCodec::new());
    Box::pin(framed.filter_map(|frame| async move {
        match frame {
            Ok(payload) => match serde_json::from_str::<RemoteCommand>(&payload) {
                Ok(command) => Some(Ok(command)),
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable command frame");
                    None
                }
            },
            Err(e) => Some(Err(RemoteError::Io(e))),
        }
    }))
}
