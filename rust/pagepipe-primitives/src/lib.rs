#![doc = include_str!("../README.md")]
#![no_std]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod region;

#[cfg(any(test, feature = "alloc"))]
pub use region::HeapRegion;
pub use region::Region;

// OS-level primitives (require std)
#[cfg(all(feature = "std", unix))]
pub mod event;
#[cfg(all(feature = "std", unix))]
pub mod futex;
#[cfg(all(feature = "std", unix))]
pub mod mmap;

#[cfg(all(feature = "std", unix))]
pub use event::{Event, WaitOutcome};
#[cfg(all(feature = "std", unix))]
pub use futex::{futex_wait, futex_wake};
#[cfg(all(feature = "std", unix))]
pub use mmap::{MmapRegion, page_size};
