//! Channel plumbing shared by both peers: the mapped page and the event set.

use std::io;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::AtomicU32;

use tracing::debug;

use pagepipe_primitives::{Event, MmapRegion, page_size};

use crate::error::OpenError;
use crate::layout::ChunkWindow;
use crate::name::{
    BYTES_READ_SUFFIX, BYTES_WRITTEN_SUFFIX, ChannelPaths, MESSAGE_READ_SUFFIX,
    MESSAGE_SENDING_SUFFIX,
};

/// Size of the file backing one event: the futex word plus padding to a
/// cache line.
const EVENT_REGION_SIZE: usize = 64;

/// One named event: a futex word at offset 0 of its own `MAP_SHARED` file.
///
/// A fresh file is zero-filled by `ftruncate`, which is exactly the
/// unsignalled state.
pub(crate) struct NamedEvent {
    event: Event,
    _map: MmapRegion,
}

impl NamedEvent {
    fn open(path: &Path) -> io::Result<Self> {
        let (map, _created) = MmapRegion::open_or_create(path, EVENT_REGION_SIZE)?;
        let word = NonNull::new(map.region().as_ptr().cast::<AtomicU32>())
            .expect("mapped event word");
        // SAFETY: the word is at offset 0 of a page-aligned mapping that
        // `_map` keeps alive for as long as `event` exists.
        let event = unsafe { Event::from_raw(word) };
        Ok(Self { event, _map: map })
    }
}

impl std::ops::Deref for NamedEvent {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.event
    }
}

/// The four cross-process events of one channel, opened by suffix.
pub(crate) struct EventSet {
    pub message_sending: NamedEvent,
    pub message_read: NamedEvent,
    pub bytes_written: NamedEvent,
    pub bytes_read: NamedEvent,
}

impl EventSet {
    fn open(paths: &ChannelPaths) -> io::Result<Self> {
        Ok(Self {
            message_sending: NamedEvent::open(&paths.event_path(MESSAGE_SENDING_SUFFIX))?,
            message_read: NamedEvent::open(&paths.event_path(MESSAGE_READ_SUFFIX))?,
            bytes_written: NamedEvent::open(&paths.event_path(BYTES_WRITTEN_SUFFIX))?,
            bytes_read: NamedEvent::open(&paths.event_path(BYTES_READ_SUFFIX))?,
        })
    }
}

/// Everything a peer holds open for the lifetime of its endpoint.
pub(crate) struct ChannelCore {
    pub window: ChunkWindow,
    pub events: EventSet,
    _page: MmapRegion,
}

impl ChannelCore {
    /// Create-or-open every named object of the channel at `paths`.
    pub fn open(paths: &ChannelPaths) -> Result<Self, OpenError> {
        paths.ensure_dir()?;

        let expected = page_size();
        let page_path = paths.page_path();

        // A peer created by a process with a different page size is caught
        // here, before mapping; `attach_exact` below closes the race window.
        if let Ok(md) = std::fs::metadata(&page_path) {
            let found = md.len() as usize;
            if found != 0 && found != expected {
                return Err(OpenError::SizeMismatch { expected, found });
            }
        }

        let (page, created) = MmapRegion::open_or_create(&page_path, expected)?;
        // SAFETY: the page mapping is page-aligned and lives in `_page`
        // alongside every `ChunkWindow` copy handed out below.
        let window = unsafe { ChunkWindow::new(page.region()) };
        let events = EventSet::open(paths)?;

        debug!(
            name = %paths.name(),
            page = expected,
            created,
            "channel objects open"
        );

        Ok(Self {
            window,
            events,
            _page: page,
        })
    }
}
