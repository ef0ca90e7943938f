// Frame decoder for the command channel.
// Wire format: <decimal payload length>\n<payload>

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Upper bound on a single command frame; anything larger is a corrupt or
/// hostile stream, not a real command.
const MAX_FRAME_SIZE: usize = 64 * 1024;

pub struct CommandCodec {
    state: CodecState,
}

enum CodecState {
    // Waiting for the size line
    ReadingSize,
    // Size parsed, accumulating payload bytes
    ReadingPayload { expected_size: usize },
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandCodec {
    pub fn new() -> Self {
        Self {
            state: CodecState::ReadingSize,
        }
    }
}

impl Decoder for CommandCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match &mut self.state {
                CodecState::ReadingSize => {
                    let Some(newline_pos) = buf.iter().position(|&b| b == b'\n') else {
                        // No complete size line yet
                        return Ok(None);
                    };
                    let line = buf.split_to(newline_pos + 1);
                    let size_str = std::str::from_utf8(&line[..line.len() - 1])
                        .map_err(|_| {
                            std::io::Error::new(
                                std::io::ErrorKind::InvalidData,
                                "Invalid UTF-8 in size header",
                            )
                        })?
                        .trim();

                    if size_str.is_empty() || !size_str.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("Expected numeric frame size, got: {:?}", size_str),
                        ));
                    }

                    let expected_size = size_str.parse::<usize>().map_err(|_| {
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("Invalid frame size: {}", size_str),
                        )
                    })?;

                    if expected_size > MAX_FRAME_SIZE {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("Frame size {} exceeds limit", expected_size),
                        ));
                    }

                    self.state = CodecState::ReadingPayload { expected_size };
                    // Payload bytes may already be buffered
                    continue;
                }

                CodecState::ReadingPayload { expected_size } => {
                    if buf.len() < *expected_size {
                        return Ok(None);
                    }
                    let payload = buf.split_to(*expected_size);
                    let message = String::from_utf8(payload.to_vec()).map_err(|_| {
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "Invalid UTF-8 in frame payload",
                        )
                    })?;

                    self.state = CodecState::ReadingSize;
                    return Ok(Some(message));
                }
            }
        }
    }
}
