//! Presentation bridge
//!
//! Whatever draws the page list implements [`PresentationSink`] and resolves
//! each visible page through [`PageDisplay`].

use std::sync::Arc;

use super::request::Notification;
use super::types::{Bitmap, PageSlot};

/// Receiver of cache change notifications on the presentation context
pub trait PresentationSink {
    /// Every page may have changed
    fn all_changed(&mut self);

    /// Pages `[start, start + count)` changed
    fn range_changed(&mut self, start: usize, count: usize);
}

/// Forward one notification to a sink
pub fn deliver(sink: &mut impl PresentationSink, notification: Notification) {
    match notification {
        Notification::AllChanged => sink.all_changed(),
        Notification::RangeChanged { start, count } => sink.range_changed(start, count),
    }
}

/// What to draw for a page
#[derive(Clone)]
pub struct PageDisplay {
    /// The page bitmap, or the shared placeholder while it is pending
    pub bitmap: Arc<Bitmap>,
    /// Whether a progress indicator should be shown over the bitmap
    pub loading: bool,
}

impl PageDisplay {
    /// Resolve a slot against the shared placeholder
    #[must_use]
    pub fn resolve(slot: &PageSlot, placeholder: &Arc<Bitmap>) -> Self {
        match slot.bitmap() {
            Some(bitmap) => Self {
                bitmap: bitmap.clone(),
                loading: false,
            },
            None => Self {
                bitmap: placeholder.clone(),
                loading: true,
            },
        }
    }

    #[must_use]
    pub fn width_px(&self) -> u32 {
        self.bitmap.width()
    }

    #[must_use]
    pub fn height_px(&self) -> u32 {
        self.bitmap.height()
    }

    /// Layout height when drawn `view_width` pixels wide, keeping the aspect
    /// ratio; zero for a zero-width bitmap
    #[must_use]
    pub fn scaled_height(&self, view_width: u32) -> u32 {
        let width = self.width_px();
        if width == 0 {
            return 0;
        }
        let ratio = f64::from(width) / f64::from(view_width.max(1));
        (f64::from(self.height_px()) / ratio).round() as u32
    }
}

impl std::fmt::Debug for PageDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDisplay")
            .field("width_px", &self.width_px())
            .field("height_px", &self.height_px())
            .field("loading", &self.loading)
            .finish()
    }
}
