//! Body reader driving decode -> assemble -> parse.

use std::collections::VecDeque;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::sse::{parse_message, Frame, FrameAssembler, LineDecoder, Message};
use crate::traits::{ByteStream, HttpError};

/// Owns the response body; dropping it releases the connection.
struct ReaderGuard {
    body: ByteStream,
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        debug!("Stream reader released");
    }
}

/// Result of one pull from the reader.
pub(crate) enum ReadStep {
    Message(Message),
    End,
    Aborted,
    Failed(HttpError),
}

pub(crate) struct FrameReader {
    guard: ReaderGuard,
    decoder: LineDecoder,
    assembler: FrameAssembler,
    /// Frames completed by the last chunk, not yet delivered
    ready: VecDeque<Frame>,
    finished: bool,
    delivered: usize,
}

impl FrameReader {
    pub(crate) fn new(body: ByteStream) -> Self {
        Self {
            guard: ReaderGuard { body },
            decoder: LineDecoder::new(),
            assembler: FrameAssembler::new(),
            ready: VecDeque::new(),
            finished: false,
            delivered: 0,
        }
    }

    /// Pull the next message.
    ///
    /// The signal is checked before every delivery and before and after every
    /// read, and the read itself is raced against it, so cancellation takes
    /// effect within one read cycle.
    pub(crate) async fn next_message(&mut self, signal: &CancellationToken) -> ReadStep {
        loop {
            if signal.is_cancelled() {
                return ReadStep::Aborted;
            }

            if let Some(frame) = self.ready.pop_front() {
                self.delivered += 1;
                return ReadStep::Message(parse_message(frame));
            }

            if self.finished {
                debug!(frames = self.delivered, "End of stream body");
                return ReadStep::End;
            }

            let chunk = tokio::select! {
                biased;
                _ = signal.cancelled() => return ReadStep::Aborted,
                chunk = self.guard.body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for line in self.decoder.feed(&bytes) {
                        self.push_line(&line);
                    }
                }
                Some(Err(err)) => return ReadStep::Failed(err),
                None => {
                    if let Some(line) = self.decoder.flush() {
                        self.push_line(&line);
                    }
                    if let Some(frame) = self.assembler.finish() {
                        debug!("Flushing unterminated final frame");
                        self.ready.push_back(frame);
                    }
                    self.finished = true;
                }
            }
        }
    }

    fn push_line(&mut self, line: &str) {
        if let Some(frame) = self.assembler.consume(line) {
            self.ready.push_back(frame);
        }
    }
}
