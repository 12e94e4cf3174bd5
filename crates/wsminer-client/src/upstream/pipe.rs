//! Request body pipe between the dispatch loop and one exchange task.
//!
//! The dispatch loop owns the `UpstreamPipe` (registered in the session's
//! correlator); the exchange task owns the matching `PipeEnds`. Dropping the
//! pipe, for any reason other than the exchange finishing, aborts the exchange.

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

/// Outcome of [`UpstreamPipe::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeWrite {
    Written,
    /// Bodiless method, or the body was already closed.
    NotWritable,
    /// Upstream is not draining fast enough; the exchange must be aborted.
    Overflow,
}

pub struct UpstreamPipe {
    body: Option<mpsc::Sender<Bytes>>,
    input_closed: Option<oneshot::Sender<()>>,
    _abort: oneshot::Sender<()>,
}

/// Exchange-task side of a pipe.
pub struct PipeEnds {
    /// Request body chunks, `None` for bodiless methods.
    pub body: Option<mpsc::Receiver<Bytes>>,
    /// Resolves `Ok` once `request-end` arrived.
    pub input_closed: oneshot::Receiver<()>,
    /// Resolves once the pipe is dropped.
    pub aborted: oneshot::Receiver<()>,
}

impl UpstreamPipe {
    pub fn open(writable: bool, capacity: usize) -> (Self, PipeEnds) {
        let (body_tx, body_rx) = match writable {
            true => {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                (Some(tx), Some(rx))
            }
            false => (None, None),
        };
        let (closed_tx, closed_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = oneshot::channel();

        let pipe = Self {
            body: body_tx,
            input_closed: Some(closed_tx),
            _abort: abort_tx,
        };
        let ends = PipeEnds {
            body: body_rx,
            input_closed: closed_rx,
            aborted: abort_rx,
        };
        (pipe, ends)
    }

    /// Queue one request body chunk without waiting.
    pub fn write(&mut self, chunk: Bytes) -> PipeWrite {
        let Some(tx) = &self.body else {
            return PipeWrite::NotWritable;
        };
        match tx.try_send(chunk) {
            Ok(()) => PipeWrite::Written,
            Err(TrySendError::Full(_)) => PipeWrite::Overflow,
            Err(TrySendError::Closed(_)) => {
                self.body = None;
                PipeWrite::NotWritable
            }
        }
    }

    /// End of request input: finish the upstream body and release the
    /// exchange's `response-end`.
    pub fn close(&mut self) {
        self.body = None;
        if let Some(tx) = self.input_closed.take() {
            let _ = tx.send(());
        }
    }
}
