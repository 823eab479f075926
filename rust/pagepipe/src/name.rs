//! Channel naming and on-disk rendezvous paths.
//!
//! Both peers derive every shared object from the channel name alone: the
//! page uses the name itself, the four events append a fixed suffix each.
//! The suffixes are the wire contract between peers and must not change.

use std::fmt::{self, Write as _};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Suffix of the event raised once per message by the sender.
pub const MESSAGE_SENDING_SUFFIX: &str = "_MessageSending";
/// Suffix of the event raised once per message by the receiver.
pub const MESSAGE_READ_SUFFIX: &str = "_MessageRead";
/// Suffix of the per-chunk "window is full, read it" event.
pub const BYTES_WRITTEN_SUFFIX: &str = "_BytesWritten";
/// Suffix of the per-chunk "window is drained, reuse it" event.
pub const BYTES_READ_SUFFIX: &str = "_BytesRead";

/// All four event suffixes, in handshake order.
pub const EVENT_SUFFIXES: [&str; 4] = [
    MESSAGE_SENDING_SUFFIX,
    MESSAGE_READ_SUFFIX,
    BYTES_WRITTEN_SUFFIX,
    BYTES_READ_SUFFIX,
];

/// Maximum accepted channel name length in bytes.
pub const MAX_NAME_LEN: usize = 200;

/// A validated channel name shared by both peers.
///
/// Any non-empty string up to [`MAX_NAME_LEN`] bytes is accepted; characters
/// that are not filesystem-safe (such as the backslash in `Local\test`) are
/// percent-encoded when the name is turned into file names, identically in
/// both peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    /// Parse and validate a channel name.
    pub fn new(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong { len: raw.len() });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors from [`ChannelName::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong { len: usize },
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "channel name must not be empty"),
            Self::TooLong { len } => {
                write!(f, "channel name is {len} bytes (max {MAX_NAME_LEN})")
            }
        }
    }
}

impl std::error::Error for NameError {}

/// Encode a shared-object name into a file name.
///
/// Bytes outside `[A-Za-z0-9._-]` become `%XX`, so distinct names never
/// collide and both peers produce the same file name for the same input.
fn encode_object_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for &b in name.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(b as char),
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

/// Rendezvous paths for one channel: a directory plus the derived file name
/// of the shared page and of each named event.
#[derive(Debug, Clone)]
pub struct ChannelPaths {
    dir: PathBuf,
    name: ChannelName,
}

impl ChannelPaths {
    /// Channel paths rooted at an explicit directory.
    pub fn new(dir: impl AsRef<Path>, name: ChannelName) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            name,
        }
    }

    /// Channel paths under the default rendezvous directory:
    /// `/dev/shm/pagepipe` where that tmpfs exists, otherwise `pagepipe`
    /// under the system temp directory.
    pub fn in_default_dir(name: ChannelName) -> Self {
        Self::new(default_dir(), name)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    /// Path of the shared page.
    pub fn page_path(&self) -> PathBuf {
        self.dir.join(encode_object_name(self.name.as_str()))
    }

    /// Path of the named event with the given suffix.
    pub fn event_path(&self, suffix: &str) -> PathBuf {
        let mut object = String::with_capacity(self.name.as_str().len() + suffix.len());
        object.push_str(self.name.as_str());
        object.push_str(suffix);
        self.dir.join(encode_object_name(&object))
    }

    /// Create the rendezvous directory if needed.
    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }
}

fn default_dir() -> PathBuf {
    let base = if Path::new("/dev/shm").is_dir() {
        PathBuf::from("/dev/shm")
    } else {
        std::env::temp_dir()
    };
    base.join("pagepipe")
}

/// Best-effort removal of a channel's files.
///
/// For recovering a name whose previous peers crashed without cleanup. Must
/// not be called while any live peer still uses the channel.
pub fn purge(paths: &ChannelPaths) -> io::Result<()> {
    let mut targets = vec![paths.page_path()];
    targets.extend(EVENT_SUFFIXES.iter().map(|s| paths.event_path(s)));

    for target in targets {
        match std::fs::remove_file(&target) {
            Ok(()) => debug!(path = %target.display(), "purged channel file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
