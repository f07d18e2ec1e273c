//! Render lane - the single thread that talks to the document and mutates the cache

use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use super::cache::{SharedCache, lock_cache};
use super::debounce::Debouncer;
use super::document::{Document, DocumentOpener};
use super::range::IndexSet;
use super::request::{
    DocumentOpenError, Notification, OpenReport, PageRenderError, WorkerRequest,
};
use super::state::{Command, Effect, WindowState};
use super::types::PageSlot;
use crate::panic_handler::catch_contained;

/// Lane parameters fixed for the lifetime of a document
#[derive(Clone, Debug)]
pub struct LaneConfig {
    pub debounce: Duration,
    pub pages_before: usize,
    pub pages_after: usize,
    pub initial_pages: usize,
}

/// Result of a load batch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub loaded: IndexSet,
    pub failed: IndexSet,
}

/// Executes load and evict batches against the document and the cache
pub struct RenderPipeline {
    document: Box<dyn Document>,
    cache: SharedCache,
    notifications: Sender<Notification>,
}

impl RenderPipeline {
    #[must_use]
    pub fn new(
        document: Box<dyn Document>,
        cache: SharedCache,
        notifications: Sender<Notification>,
    ) -> Self {
        Self {
            document,
            cache,
            notifications,
        }
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Render each page in ascending order into its slot, then send one
    /// notification covering the attempted span. A page that fails to render
    /// keeps its slot empty; the rest of the batch still runs.
    pub fn load(&mut self, pages: &IndexSet) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if pages.is_empty() {
            return outcome;
        }

        for page in pages {
            match self.render_page(page) {
                Ok(slot) => match lock_cache(&self.cache).set(page, slot) {
                    Ok(_) => {
                        outcome.loaded.insert(page);
                    }
                    Err(e) => {
                        warn!("Dropping rendered page: {e}");
                        outcome.failed.insert(page);
                    }
                },
                Err(e) => {
                    warn!("Failed to render page {page}: {e}");
                    outcome.failed.insert(page);
                }
            }
        }

        debug!(
            "Loaded {} pages ({} failed) in {}",
            outcome.loaded.len(),
            outcome.failed.len(),
            pages.span()
        );
        self.notify_span(pages);
        outcome
    }

    /// Empty each slot, dropping its bitmap, then send one notification
    pub fn evict(&mut self, pages: &IndexSet) {
        if pages.is_empty() {
            return;
        }

        {
            let mut cache = lock_cache(&self.cache);
            for page in pages {
                if let Err(e) = cache.set(page, PageSlot::Empty) {
                    warn!("Cannot evict: {e}");
                }
            }
        }

        debug!("Evicted {} pages in {}", pages.len(), pages.span());
        self.notify_span(pages);
    }

    /// Release the document
    pub fn close(&mut self) {
        self.document.close();
    }

    fn render_page(&mut self, page: usize) -> Result<PageSlot, PageRenderError> {
        let document = &mut self.document;
        let raster = catch_contained(|| document.render(page))
            .map_err(|_| PageRenderError::Panicked { page })??;
        Ok(PageSlot::loaded(raster.into_bitmap(page)?))
    }

    fn notify_span(&self, pages: &IndexSet) {
        let span = pages.span();
        if let Some(start) = span.first() {
            let _ = self.notifications.send(Notification::RangeChanged {
                start,
                count: span.len(),
            });
        }
    }
}

/// Serialized lane: debounces viewport positions, decides windows and runs
/// the resulting batches in submission order
struct RenderLane {
    pipeline: RenderPipeline,
    state: WindowState,
    debouncer: Debouncer<usize>,
    requests: Receiver<WorkerRequest>,
    waiting_barriers: Vec<Sender<()>>,
}

impl RenderLane {
    fn run(mut self) {
        self.apply(Command::Open);

        loop {
            let next = match self.debouncer.deadline() {
                Some(deadline) => self.requests.recv_deadline(deadline),
                None => self
                    .requests
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match next {
                Ok(WorkerRequest::Viewport(position)) => {
                    if let Some(dropped) = self.debouncer.arm(position, Instant::now()) {
                        debug!("Anchor {dropped} superseded by {position}");
                    }
                }

                Ok(WorkerRequest::Barrier(reply)) => {
                    if self.debouncer.is_armed() {
                        self.waiting_barriers.push(reply);
                    } else {
                        let _ = reply.send(());
                    }
                }

                Ok(WorkerRequest::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,

                Err(RecvTimeoutError::Timeout) => {
                    if let Some(position) = self.debouncer.fire(Instant::now()) {
                        self.apply(Command::ViewportSettled(position));
                        for reply in self.waiting_barriers.drain(..) {
                            let _ = reply.send(());
                        }
                    }
                }
            }
        }

        self.pipeline.close();
        info!("Render lane stopped");
    }

    fn apply(&mut self, cmd: Command) {
        let current = lock_cache(&self.pipeline.cache).current_window();
        for effect in self.state.apply(cmd, current) {
            match effect {
                Effect::ReplaceWindow(window) => {
                    lock_cache(&self.pipeline.cache).replace_window(window);
                }
                Effect::Evict(pages) => self.pipeline.evict(&pages),
                Effect::Load(pages) => {
                    self.pipeline.load(&pages);
                }
            }
        }
    }
}

/// Placeholder size used when no page of the initial window can be measured
/// (A4 at 72 dpi)
pub const FALLBACK_PAGE_SIZE: (u32, u32) = (595, 842);

/// Size of the first measurable page among the leading `initial_pages`, so
/// placeholders keep a usable aspect ratio; `None` only for empty documents
fn placeholder_size(document: &dyn Document, initial_pages: usize) -> Option<(u32, u32)> {
    let page_count = document.page_count();
    if page_count == 0 {
        return None;
    }
    let measured_span = initial_pages.clamp(1, page_count);
    for page in 0..measured_span {
        match document.page_size(page) {
            Ok((width, height)) if width > 0 && height > 0 => return Some((width, height)),
            Ok(size) => warn!("Page {page} has degenerate size {size:?}"),
            Err(e) => warn!("Cannot measure page {page}: {e}"),
        }
    }
    warn!("No page among the first {measured_span} could be measured, using {FALLBACK_PAGE_SIZE:?}");
    Some(FALLBACK_PAGE_SIZE)
}

/// Lane entry point: open the document, report back, then serve requests
/// until shutdown.
///
/// On open failure nothing is written to the cache and the lane exits right
/// after reporting the error.
pub fn render_worker(
    opener: DocumentOpener,
    config: LaneConfig,
    requests: Receiver<WorkerRequest>,
    notifications: Sender<Notification>,
    cache: SharedCache,
    opened: Sender<Result<OpenReport, DocumentOpenError>>,
) {
    let document = match opener() {
        Ok(document) => document,
        Err(e) => {
            let _ = opened.send(Err(e));
            return;
        }
    };

    let page_count = document.page_count();
    let first_page_size = placeholder_size(&*document, config.initial_pages);

    lock_cache(&cache).reset(page_count);
    let _ = notifications.send(Notification::AllChanged);
    if opened
        .send(Ok(OpenReport {
            page_count,
            first_page_size,
        }))
        .is_err()
    {
        let mut document = document;
        document.close();
        return;
    }

    let lane = RenderLane {
        pipeline: RenderPipeline::new(document, cache, notifications),
        state: WindowState::new(page_count)
            .with_margins(config.pages_before, config.pages_after)
            .with_initial_pages(config.initial_pages),
        debouncer: Debouncer::new(config.debounce),
        requests,
        waiting_barriers: Vec::new(),
    };
    lane.run();
}
