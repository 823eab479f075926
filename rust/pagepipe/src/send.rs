//! The write side: `Sender` runs the per-message handshake, `SendStream`
//! chunks payload bytes through the window.

use std::io::{self, Write};

use tracing::{debug, trace};

use crate::channel::{ChannelCore, EventSet};
use crate::error::{OpenError, SendError};
use crate::layout::ChunkWindow;
use crate::name::ChannelPaths;

/// The write side of a channel.
///
/// One process holds the `Sender`, its peer holds the
/// [`Receiver`](crate::Receiver) for the same [`ChannelPaths`]. Messages are
/// transferred one at a time; `&mut self` keeps the per-peer protocol state
/// single-threaded by construction.
pub struct Sender {
    core: Option<ChannelCore>,
}

impl Sender {
    /// Open the write side, creating the channel objects if this peer
    /// arrives first.
    pub fn open(paths: &ChannelPaths) -> Result<Self, OpenError> {
        let core = ChannelCore::open(paths)?;
        debug!(name = %paths.name(), "sender open");
        Ok(Self { core: Some(core) })
    }

    /// Transmit one message.
    ///
    /// `write` is handed a [`SendStream`] and runs to completion before this
    /// call returns; everything it writes forms a single message on the
    /// receiving side. Writing nothing transmits a legal empty message.
    ///
    /// If `write` fails, the message is terminated with an empty final
    /// chunk (the peer observes an aborted message, empty unless full chunks
    /// had already been handed over) and the original error comes back as
    /// [`SendError::Callback`] once the handshake completes.
    pub fn send_message<F>(&mut self, write: F) -> Result<(), SendError>
    where
        F: FnOnce(&mut SendStream<'_>) -> io::Result<()>,
    {
        let core = self.core.as_ref().ok_or(SendError::Disposed)?;

        core.events.message_sending.signal();

        let mut stream = SendStream {
            window: core.window,
            events: &core.events,
            pos: 0,
            chunks: 0,
            total: 0,
        };
        let result = write(&mut stream);

        // The final chunk: the staged tail on success, the empty
        // cancellation chunk on callback failure.
        let tail = match &result {
            Ok(()) => stream.pos,
            Err(e) => {
                debug!(error = %e, "send callback failed; aborting message");
                0
            }
        };
        core.window.publish_header(tail as u32, true);
        core.events.bytes_written.signal();

        core.events.message_read.wait();
        trace!(
            bytes = stream.total,
            chunks = stream.chunks + 1,
            "message sent"
        );

        result.map_err(SendError::Callback)
    }

    /// Release the channel handles. Idempotent; a later
    /// [`send_message`](Self::send_message) fails with
    /// [`SendError::Disposed`].
    pub fn dispose(&mut self) {
        if self.core.take().is_some() {
            debug!("sender disposed");
        }
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Write-only, non-seekable byte sink for one in-flight message.
///
/// Exists only inside a [`Sender::send_message`] call. Bytes are staged into
/// the window; each time the window fills, a non-final chunk is handed to the
/// receiver and the write blocks until the receiver drains it.
pub struct SendStream<'a> {
    window: ChunkWindow,
    events: &'a EventSet,
    /// Staged bytes not yet published, in `[0, window_len]`.
    pos: usize,
    chunks: u32,
    total: u64,
}

impl Write for SendStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let window_len = self.window.window_len();

        let mut off = 0;
        while off < buf.len() {
            let n = (buf.len() - off).min(window_len - self.pos);
            self.window.write_data(self.pos, &buf[off..off + n]);
            self.pos += n;
            off += n;

            if self.pos == window_len {
                self.window.publish_header(window_len as u32, false);
                self.events.bytes_written.signal();
                self.events.bytes_read.wait();
                self.pos = 0;
                self.chunks += 1;
            }
        }

        self.total += buf.len() as u64;
        Ok(buf.len())
    }

    /// No-op: chunk hand-off is driven by window fullness, and the enclosing
    /// [`Sender::send_message`] publishes the final partial chunk.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
