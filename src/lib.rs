//! Windowed page cache for incrementally rendering large paginated documents.
//!
//! Only a bounded window of pages around the viewport is kept as bitmaps;
//! see [`pdf::PageWindowService`].

pub mod panic_handler;
pub mod pdf;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use pdf::{Notification, PageRange, PageWindowService, PresentationSink};
pub use settings::{Settings, WindowConfig};
