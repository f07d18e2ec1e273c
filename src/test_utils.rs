//! Scripted documents and sinks for exercising the render lane

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::pdf::{
    Document, DocumentOpenError, DocumentOpener, InvalidIndexError, Notification, PageRenderError,
    PresentationSink, RasterPage,
};

/// Shared record of the pages a [`FakeDocument`] rendered, in call order
pub type RenderLog = Arc<Mutex<Vec<usize>>>;

/// In-memory document whose pages are solid rasters filled with `page % 256`
#[derive(Clone)]
pub struct FakeDocument {
    page_count: usize,
    page_size: (u32, u32),
    failing: HashSet<usize>,
    panicking: HashSet<usize>,
    unmeasurable: HashSet<usize>,
    delay: Option<Duration>,
    log: RenderLog,
    closed: Arc<AtomicBool>,
}

impl FakeDocument {
    #[must_use]
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            page_size: (6, 8),
            failing: HashSet::new(),
            panicking: HashSet::new(),
            unmeasurable: HashSet::new(),
            delay: None,
            log: Arc::default(),
            closed: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, width: u32, height: u32) -> Self {
        self.page_size = (width, height);
        self
    }

    /// Pages whose render returns an engine error
    #[must_use]
    pub fn failing_on(mut self, pages: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(pages);
        self
    }

    /// Pages whose render panics
    #[must_use]
    pub fn panicking_on(mut self, pages: impl IntoIterator<Item = usize>) -> Self {
        self.panicking.extend(pages);
        self
    }

    /// Pages whose `page_size` returns an engine error
    #[must_use]
    pub fn unmeasurable_on(mut self, pages: impl IntoIterator<Item = usize>) -> Self {
        self.unmeasurable.extend(pages);
        self
    }

    /// Sleep this long inside every render
    #[must_use]
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handle to the render log, valid after the document moves to the lane
    #[must_use]
    pub fn render_log(&self) -> RenderLog {
        self.log.clone()
    }

    /// Flag set once `close` has been called
    #[must_use]
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    /// Opener handing this document to the render lane
    #[must_use]
    pub fn opener(self) -> DocumentOpener {
        Box::new(move || -> Result<Box<dyn Document>, DocumentOpenError> { Ok(Box::new(self)) })
    }

    /// Opener that fails the way a corrupt file would
    #[must_use]
    pub fn failing_opener() -> DocumentOpener {
        Box::new(|| -> Result<Box<dyn Document>, DocumentOpenError> {
            Err(DocumentOpenError::Engine("no objects found".to_string()))
        })
    }
}

impl Document for FakeDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page: usize) -> Result<(u32, u32), PageRenderError> {
        InvalidIndexError::check(page, self.page_count)?;
        if self.unmeasurable.contains(&page) {
            return Err(PageRenderError::engine(format!("page {page} has no media box")));
        }
        Ok(self.page_size)
    }

    fn render(&mut self, page: usize) -> Result<RasterPage, PageRenderError> {
        InvalidIndexError::check(page, self.page_count)?;
        self.log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(page);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panicking.contains(&page) {
            panic!("fake renderer blew up on page {page}");
        }
        if self.failing.contains(&page) {
            return Err(PageRenderError::engine(format!("page {page} is corrupt")));
        }

        let (width, height) = self.page_size;
        Ok(RasterPage {
            width,
            height,
            pixels: vec![(page % 256) as u8; (width * height * 3) as usize],
        })
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Sink recording every notification it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub received: Vec<Notification>,
}

impl PresentationSink for RecordingSink {
    fn all_changed(&mut self) {
        self.received.push(Notification::AllChanged);
    }

    fn range_changed(&mut self, start: usize, count: usize) {
        self.received
            .push(Notification::RangeChanged { start, count });
    }
}
