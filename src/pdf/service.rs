//! Page window service - the presentation side's handle on the render lane

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, error, info};

use super::adapter::{PageDisplay, PresentationSink, deliver};
use super::cache::{PageCache, SharedCache, lock_cache};
use super::document::DocumentOpener;
use super::range::{IndexSet, PageRange};
use super::request::{DocumentOpenError, InvalidIndexError, Notification, WorkerRequest};
use super::types::{Bitmap, PageSlot, placeholder_bitmap};
use super::worker::render_worker;
use crate::settings::WindowConfig;

/// Keeps a bounded window of rendered pages around the viewport.
///
/// All rendering and cache mutation happens on a dedicated render lane; this
/// handle forwards viewport positions to it and reads the cache after the
/// lane has published a change notification.
pub struct PageWindowService {
    config: WindowConfig,
    request_tx: Sender<WorkerRequest>,
    notification_rx: Receiver<Notification>,
    cache: SharedCache,
    placeholder: Arc<Bitmap>,
    page_count: usize,
    last_observed: Option<usize>,
    worker: Option<JoinHandle<()>>,
}

impl PageWindowService {
    /// Open a document on a new render lane.
    ///
    /// Blocks until the lane has opened the document. On failure the lane
    /// has already exited and no cache exists.
    pub fn open(opener: DocumentOpener, config: WindowConfig) -> Result<Self, DocumentOpenError> {
        let cache = Arc::new(Mutex::new(PageCache::default()));
        let (request_tx, request_rx) = flume::unbounded();
        let (notification_tx, notification_rx) = flume::unbounded();
        let (opened_tx, opened_rx) = flume::bounded(1);

        let lane_cache = cache.clone();
        let lane_config = config.lane_config();
        let worker = std::thread::Builder::new()
            .name("pagepool-render".to_string())
            .spawn(move || {
                render_worker(
                    opener,
                    lane_config,
                    request_rx,
                    notification_tx,
                    lane_cache,
                    opened_tx,
                );
            })
            .map_err(DocumentOpenError::Spawn)?;

        let report = match opened_rx.recv() {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                error!("Failed to open document: {e}");
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(DocumentOpenError::WorkerUnavailable);
            }
        };

        info!(
            "Document ready: {} pages, placeholder {:?}",
            report.page_count, report.first_page_size
        );

        Ok(Self {
            config,
            request_tx,
            notification_rx,
            cache,
            placeholder: Arc::new(placeholder_bitmap(report.first_page_size)),
            page_count: report.page_count,
            last_observed: None,
            worker: Some(worker),
        })
    }

    /// Swap in another document.
    ///
    /// The new document is opened first; only when that succeeds is the old
    /// lane stopped and its document closed. On failure the current document
    /// stays in place.
    pub fn replace_document(&mut self, opener: DocumentOpener) -> Result<(), DocumentOpenError> {
        let next = Self::open(opener, self.config.clone())?;
        let previous = std::mem::replace(self, next);
        drop(previous);
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Record the anchor page reported by the view.
    ///
    /// Repeats of the most recently observed position are dropped here;
    /// anything else re-arms the lane's debounce timer. Returns whether the
    /// position was forwarded.
    pub fn on_viewport_changed(&mut self, position: usize) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let position = position.min(self.page_count - 1);
        if self.last_observed == Some(position) {
            return false;
        }
        self.last_observed = Some(position);
        debug!("Viewport anchor {position}");
        self.request_tx
            .send(WorkerRequest::Viewport(position))
            .is_ok()
    }

    /// Current state of a page slot
    pub fn slot(&self, page: usize) -> Result<PageSlot, InvalidIndexError> {
        lock_cache(&self.cache).get(page)
    }

    /// What the view should draw for a page
    pub fn display(&self, page: usize) -> Result<PageDisplay, InvalidIndexError> {
        let slot = self.slot(page)?;
        Ok(PageDisplay::resolve(&slot, &self.placeholder))
    }

    /// Shared raster shown for pages without a bitmap
    #[must_use]
    pub fn placeholder(&self) -> &Arc<Bitmap> {
        &self.placeholder
    }

    #[must_use]
    pub fn current_window(&self) -> PageRange {
        lock_cache(&self.cache).current_window()
    }

    #[must_use]
    pub fn loaded_pages(&self) -> IndexSet {
        lock_cache(&self.cache).loaded_pages()
    }

    /// Drain pending change notifications
    pub fn poll_notifications(&mut self) -> Vec<Notification> {
        self.notification_rx.drain().collect()
    }

    /// Deliver pending change notifications to a sink, returning how many
    pub fn dispatch_notifications(&mut self, sink: &mut impl PresentationSink) -> usize {
        let mut delivered = 0;
        while let Ok(notification) = self.notification_rx.try_recv() {
            deliver(sink, notification);
            delivered += 1;
        }
        delivered
    }

    /// Get the notification receiver for event-loop integration
    #[must_use]
    pub fn notification_receiver(&self) -> &Receiver<Notification> {
        &self.notification_rx
    }

    /// Block until the lane has handled every forwarded position, including a
    /// pending debounced recompute and its batches. Returns `false` on timeout
    /// or if the lane is gone.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        let (reply_tx, reply_rx) = flume::bounded(1);
        if self
            .request_tx
            .send(WorkerRequest::Barrier(reply_tx))
            .is_err()
        {
            return false;
        }
        reply_rx.recv_timeout(timeout).is_ok()
    }

    /// Stop the render lane and close the document
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.request_tx.send(WorkerRequest::Shutdown);
            if worker.join().is_err() {
                error!("Render lane panicked");
            }
        }
    }
}

impl Drop for PageWindowService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeDocument;

    const SETTLE: Duration = Duration::from_secs(5);

    fn config() -> WindowConfig {
        WindowConfig {
            debounce_ms: 5,
            ..WindowConfig::default()
        }
    }

    #[test]
    fn open_loads_initial_window() {
        let mut service =
            PageWindowService::open(FakeDocument::new(3).opener(), config()).expect("open");
        assert!(service.wait_until_settled(SETTLE));

        assert_eq!(service.page_count(), 3);
        assert_eq!(service.current_window(), PageRange::new(0, 2));
        assert_eq!(service.loaded_pages(), IndexSet::from(PageRange::new(0, 2)));
        assert_eq!(
            service.poll_notifications(),
            vec![
                Notification::AllChanged,
                Notification::RangeChanged { start: 0, count: 3 }
            ]
        );
    }

    #[test]
    fn open_failure_is_returned() {
        let result = PageWindowService::open(FakeDocument::failing_opener(), config());
        assert!(matches!(result, Err(DocumentOpenError::Engine(_))));
    }

    #[test]
    fn placeholder_is_sized_like_first_page() {
        let document = FakeDocument::new(2).with_page_size(40, 60);
        let service = PageWindowService::open(document.opener(), config()).expect("open");
        assert_eq!(service.placeholder().dimensions(), (40, 60));
    }

    #[test]
    fn duplicate_position_is_not_forwarded() {
        let mut service =
            PageWindowService::open(FakeDocument::new(50).opener(), config()).expect("open");
        assert!(service.on_viewport_changed(20));
        assert!(!service.on_viewport_changed(20));
        assert!(service.on_viewport_changed(21));
    }

    #[test]
    fn position_past_the_end_is_clamped() {
        let mut service =
            PageWindowService::open(FakeDocument::new(10).opener(), config()).expect("open");
        service.on_viewport_changed(500);
        assert!(service.wait_until_settled(SETTLE));
        assert_eq!(service.current_window(), PageRange::new(5, 9));
    }

    #[test]
    fn empty_document_ignores_viewport() {
        let mut service =
            PageWindowService::open(FakeDocument::new(0).opener(), config()).expect("open");
        assert!(!service.on_viewport_changed(0));
        assert!(service.wait_until_settled(SETTLE));
        assert_eq!(service.current_window(), PageRange::EMPTY);
        assert_eq!(service.placeholder().dimensions(), (0, 0));
        assert!(service.slot(0).is_err());
    }

    #[test]
    fn shutdown_closes_document() {
        let document = FakeDocument::new(4);
        let closed = document.closed_flag();
        let mut service = PageWindowService::open(document.opener(), config()).expect("open");
        service.shutdown();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!service.wait_until_settled(Duration::from_millis(50)));
    }
}
