//! Windowed page rendering infrastructure

mod adapter;
mod cache;
mod debounce;
mod document;
mod range;
mod request;
mod service;
mod state;
mod types;
mod worker;

pub use adapter::{PageDisplay, PresentationSink, deliver};
pub use cache::{PageCache, SharedCache, lock_cache};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
#[cfg(feature = "pdf")]
pub use document::MupdfDocument;
pub use document::{Document, DocumentOpener, DocumentSource};
pub use range::{IndexSet, PageRange};
pub use request::{
    DocumentOpenError, InvalidIndexError, Notification, OpenReport, PageRenderError,
    WorkerRequest,
};
pub use service::PageWindowService;
pub use state::{
    Command, DEFAULT_INITIAL_PAGES, DEFAULT_PAGES_AFTER, DEFAULT_PAGES_BEFORE, Effect, WindowDiff,
    WindowState,
};
pub use types::*;
pub use worker::{BatchOutcome, FALLBACK_PAGE_SIZE, LaneConfig, RenderPipeline, render_worker};
