//! The shared page: a 6-byte chunk header followed by the data window.
//!
//! ```text
//! | offset | size  | field             |
//! |--------|-------|-------------------|
//! | 0      | 4     | bytes_written     |  valid bytes in the current chunk
//! | 4      | 1     | message_completed |  non-zero iff final chunk
//! | 5      | 1     | (reserved, zero)  |
//! | 6      | P − 6 | data              |  chunk payload
//! ```
//!
//! `bytes_written` is native-endian (little-endian on all supported
//! platforms). The data window starts at the unaligned offset 6, so the view
//! is built from offset constants rather than one `repr(C)` struct, which
//! would pad the header to 8 bytes.
//!
//! The header fields are accessed as atomics (release stores on publish,
//! acquire loads on consume) while the data window moves with plain copies:
//! the publish/consume pair around every chunk orders them.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use pagepipe_primitives::Region;

/// Size of the chunk header in bytes.
pub const HEADER_SIZE: usize = 6;

/// Byte offset of the `bytes_written` field.
pub const BYTES_WRITTEN_OFFSET: usize = 0;
/// Byte offset of the `message_completed` flag.
pub const MESSAGE_COMPLETED_OFFSET: usize = 4;
/// Byte offset of the reserved byte.
pub const RESERVED_OFFSET: usize = 5;
/// Byte offset of the data window.
pub const DATA_OFFSET: usize = 6;

const _: () = assert!(DATA_OFFSET == HEADER_SIZE);
const _: () = assert!(RESERVED_OFFSET + 1 == DATA_OFFSET);

/// One published chunk header, as read by the consuming side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Valid bytes in the data window.
    pub len: u32,
    /// Whether this chunk ends the message.
    pub completed: bool,
}

/// Typed view over the shared page.
///
/// Plain `Copy` handle; the mapping it points into must outlive every copy.
#[derive(Clone, Copy)]
pub struct ChunkWindow {
    region: Region,
}

impl ChunkWindow {
    /// Create the view over a mapped channel page.
    ///
    /// # Safety
    ///
    /// `region` must map the channel page for the lifetime of this view, with
    /// a 4-byte-aligned base (a page-aligned mapping always qualifies).
    pub unsafe fn new(region: Region) -> Self {
        assert!(
            region.len() > HEADER_SIZE,
            "page too small for chunk header"
        );
        Self { region }
    }

    /// Number of payload bytes one chunk can carry (`W = P − 6`).
    #[inline]
    pub fn window_len(&self) -> usize {
        self.region.len() - DATA_OFFSET
    }

    #[inline]
    fn bytes_written(&self) -> &AtomicU32 {
        // SAFETY: offset 0 of a 4-aligned region, in bounds per `new`.
        unsafe { self.region.get::<AtomicU32>(BYTES_WRITTEN_OFFSET) }
    }

    #[inline]
    fn completed(&self) -> &AtomicU8 {
        // SAFETY: byte-aligned, in bounds per `new`.
        unsafe { self.region.get::<AtomicU8>(MESSAGE_COMPLETED_OFFSET) }
    }

    /// Publish a chunk header. Stage the payload with [`Self::write_data`]
    /// first; the paired event signal carries the release edge to the reader.
    pub fn publish_header(&self, len: u32, completed: bool) {
        debug_assert!(len as usize <= self.window_len());
        self.completed().store(completed as u8, Ordering::Release);
        self.bytes_written().store(len, Ordering::Release);
    }

    /// Read the header published by the writing side.
    pub fn read_header(&self) -> ChunkHeader {
        ChunkHeader {
            len: self.bytes_written().load(Ordering::Acquire),
            completed: self.completed().load(Ordering::Acquire) != 0,
        }
    }

    /// Stage payload bytes at offset `at` within the data window.
    pub fn write_data(&self, at: usize, src: &[u8]) {
        self.region.write_bytes(DATA_OFFSET + at, src);
    }

    /// Copy payload bytes at offset `at` within the data window into `dst`.
    pub fn read_data(&self, at: usize, dst: &mut [u8]) {
        self.region.read_bytes(DATA_OFFSET + at, dst);
    }
}
