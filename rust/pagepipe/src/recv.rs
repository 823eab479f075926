//! The read side: `Receiver` runs the per-message handshake, `ReceiveStream`
//! drains chunks from the window, `DisposeHandle` unblocks an idle receiver
//! from another thread.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use pagepipe_primitives::WaitOutcome;

use crate::channel::{ChannelCore, EventSet};
use crate::error::{OpenError, ReceiveError};
use crate::layout::ChunkWindow;
use crate::name::ChannelPaths;

/// State shared between the receiver and its dispose handles.
struct ReceiverShared {
    core: ChannelCore,
    disposed: AtomicBool,
}

impl ReceiverShared {
    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            // Push a blocked receive_message through its cancellation
            // re-check without forging a message signal.
            self.core.events.message_sending.poke();
            debug!("receiver disposed");
        }
    }
}

/// The read side of a channel.
///
/// Counterpart of [`Sender`](crate::Sender); see the crate docs for the
/// handshake. `&mut self` keeps the per-peer protocol state single-threaded
/// by construction; only disposal may come from another thread, via
/// [`DisposeHandle`].
pub struct Receiver {
    shared: Arc<ReceiverShared>,
}

impl Receiver {
    /// Open the read side, creating the channel objects if this peer arrives
    /// first.
    pub fn open(paths: &ChannelPaths) -> Result<Self, OpenError> {
        let core = ChannelCore::open(paths)?;
        debug!(name = %paths.name(), "receiver open");
        Ok(Self {
            shared: Arc::new(ReceiverShared {
                core,
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Receive one message.
    ///
    /// Blocks until a sender begins a message, then hands `read` a
    /// [`ReceiveStream`] that ends (reads return `Ok(0)`) exactly at the
    /// message boundary; the callback's value becomes this call's value.
    /// Callers are expected to drain the stream before returning.
    ///
    /// Returns `Ok(None)` if [`dispose`](Self::dispose) releases the wait
    /// before a message arrives. If `read` fails, the error comes back as
    /// [`ReceiveError::Callback`] and the channel is left unusable: the
    /// message was never acknowledged, so the peer's sender stays blocked.
    pub fn receive_message<T, F>(&mut self, read: F) -> Result<Option<T>, ReceiveError>
    where
        F: FnOnce(&mut ReceiveStream<'_>) -> io::Result<T>,
    {
        let shared = &*self.shared;
        if shared.disposed.load(Ordering::Acquire) {
            return Err(ReceiveError::Disposed);
        }

        match shared
            .core
            .events
            .message_sending
            .wait_or_cancel(&shared.disposed)
        {
            WaitOutcome::Cancelled => return Ok(None),
            WaitOutcome::Signalled => {}
        }

        let mut stream = ReceiveStream {
            window: shared.core.window,
            events: &shared.core.events,
            remaining: 0,
            cursor: 0,
            final_chunk: false,
            awaiting_chunk: true,
        };
        let value = match read(&mut stream) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "receive callback failed; message unacknowledged");
                return Err(ReceiveError::Callback(e));
            }
        };

        shared.core.events.message_read.signal();
        trace!("message received");
        Ok(Some(value))
    }

    /// A handle that can dispose this receiver from any thread.
    pub fn dispose_handle(&self) -> DisposeHandle {
        DisposeHandle {
            shared: self.shared.clone(),
        }
    }

    /// Dispose the receiver. Idempotent.
    ///
    /// A thread blocked in [`receive_message`](Self::receive_message) waiting
    /// for a message returns `Ok(None)`; a later call fails with
    /// [`ReceiveError::Disposed`]. A callback already running is not
    /// interrupted. The mappings are released once the last handle drops.
    pub fn dispose(&self) {
        self.shared.dispose();
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Disposes its [`Receiver`] from any thread; see [`Receiver::dispose`].
#[derive(Clone)]
pub struct DisposeHandle {
    shared: Arc<ReceiverShared>,
}

impl DisposeHandle {
    /// Dispose the receiver this handle was taken from. Idempotent.
    pub fn dispose(&self) {
        self.shared.dispose();
    }
}

/// Read-only, non-seekable byte source for one in-flight message.
///
/// Exists only inside a [`Receiver::receive_message`] call. Reads return
/// `Ok(0)` exactly when the message is fully consumed.
pub struct ReceiveStream<'a> {
    window: ChunkWindow,
    events: &'a EventSet,
    /// Bytes left in the current chunk.
    remaining: usize,
    /// Next byte offset within the data window.
    cursor: usize,
    final_chunk: bool,
    awaiting_chunk: bool,
}

impl Read for ReceiveStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.final_chunk && self.remaining == 0 {
            return Ok(0);
        }

        if self.awaiting_chunk {
            self.events.bytes_written.wait();
            let header = self.window.read_header();
            if header.len as usize > self.window.window_len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "chunk length exceeds window: peer computed a different page size",
                ));
            }
            self.remaining = header.len as usize;
            self.final_chunk = header.completed;
            self.cursor = 0;
            self.awaiting_chunk = false;

            // The empty final chunk: end of message, nothing to copy.
            if self.final_chunk && self.remaining == 0 {
                return Ok(0);
            }
        }

        let k = buf.len().min(self.remaining);
        self.window.read_data(self.cursor, &mut buf[..k]);
        self.cursor += k;
        self.remaining -= k;

        if self.remaining == 0 {
            self.awaiting_chunk = true;
            // The sender does not wait for the final chunk to be drained.
            if !self.final_chunk {
                self.events.bytes_read.signal();
            }
        }

        Ok(k)
    }
}
