//! One-way, in-order byte-stream messages over a single shared memory page.
//!
//! Two cooperating processes on one host rendezvous on a channel *name*.
//! From the name both derive a shared page (exactly one system page) and
//! four named auto-reset events; messages of unbounded length are then
//! chunked through the page's data window, one chunk in flight at a time:
//!
//! ```text
//! Sender                                    Receiver
//! ------                                    --------
//! signal MessageSending
//! run write callback           ──►          wait MessageSending
//!   write(..) fills window                  run read callback
//!   publish header                            read(..) drains window
//!   signal BytesWritten        ──►            wait BytesWritten
//!   wait BytesRead             ◄──            signal BytesRead (not final)
//!   [repeat per chunk]                        [repeat per chunk]
//! publish final header
//! signal BytesWritten          ──►
//! wait MessageRead             ◄──          signal MessageRead
//! ```
//!
//! Ownership of the page alternates with the events; no locks are involved.
//! The channel is strictly one-way and single-producer/single-consumer; use
//! two channels for a bidirectional link.
//!
//! # Usage
//!
//! ```ignore
//! use std::io::{Read, Write};
//! use pagepipe::{ChannelName, ChannelPaths, Receiver, Sender};
//!
//! let paths = ChannelPaths::in_default_dir(ChannelName::new("Local\\demo")?);
//!
//! // Process A
//! let mut sender = Sender::open(&paths)?;
//! sender.send_message(|w| w.write_all(b"hello"))?;
//!
//! // Process B
//! let mut receiver = Receiver::open(&paths)?;
//! let text = receiver.receive_message(|r| {
//!     let mut s = String::new();
//!     r.read_to_string(&mut s)?;
//!     Ok(s)
//! })?;
//! ```

mod channel;
pub mod error;
pub mod layout;
pub mod name;
pub mod recv;
pub mod send;

pub use error::{OpenError, ReceiveError, SendError};
pub use name::{
    BYTES_READ_SUFFIX, BYTES_WRITTEN_SUFFIX, ChannelName, ChannelPaths, EVENT_SUFFIXES,
    MAX_NAME_LEN, MESSAGE_READ_SUFFIX, MESSAGE_SENDING_SUFFIX, NameError, purge,
};
pub use recv::{DisposeHandle, ReceiveStream, Receiver};
pub use send::{SendStream, Sender};

// Both peers must observe the same page size; re-exported so applications
// and tests can size payloads against the window.
pub use pagepipe_primitives::page_size;
