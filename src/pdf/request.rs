//! Worker request, notification and error types

use flume::Sender;

/// Request sent to the render lane
#[derive(Debug)]
pub enum WorkerRequest {
    /// The presentation layer observed a new anchor page; (re)arms the debounce timer
    Viewport(usize),

    /// Reply once every request queued before this one has been handled and
    /// no debounced recompute is pending
    Barrier(Sender<()>),

    /// Close the document and stop the lane
    Shutdown,
}

/// Change notification delivered to the presentation context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// Every page may have changed (document opened)
    AllChanged,

    /// Pages `[start, start + count)` changed
    RangeChanged { start: usize, count: usize },
}

/// What the lane reports back once it has tried to open the document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenReport {
    pub page_count: usize,
    /// Pixel size of page 0, used to size the placeholder
    pub first_page_size: Option<(u32, u32)>,
}

/// Slot or page access outside `[0, page_count)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("page index {index} out of range for document with {page_count} pages")]
pub struct InvalidIndexError {
    pub index: usize,
    pub page_count: usize,
}

impl InvalidIndexError {
    /// Check `index` against `page_count`
    pub fn check(index: usize, page_count: usize) -> Result<(), Self> {
        if index < page_count {
            Ok(())
        } else {
            Err(Self { index, page_count })
        }
    }
}

/// Fatal failure while opening a document; no cache is constructed
#[derive(Debug, thiserror::Error)]
pub enum DocumentOpenError {
    #[error("PDF engine: {0}")]
    Engine(String),

    #[error("failed to start render lane: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("render lane exited before reporting the document")]
    WorkerUnavailable,
}

/// Page-local render failure; the slot stays empty and the batch continues
#[derive(Debug, thiserror::Error)]
pub enum PageRenderError {
    #[error("PDF engine: {0}")]
    Engine(String),

    #[error("page {page}: {actual} bytes cannot hold a {width}x{height} RGB raster")]
    BufferMismatch {
        page: usize,
        width: u32,
        height: u32,
        actual: usize,
    },

    #[error("page {page}: renderer panicked")]
    Panicked { page: usize },

    #[error(transparent)]
    InvalidIndex(#[from] InvalidIndexError),
}

impl PageRenderError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_index_check_bounds() {
        assert!(InvalidIndexError::check(0, 1).is_ok());
        assert_eq!(
            InvalidIndexError::check(3, 3),
            Err(InvalidIndexError {
                index: 3,
                page_count: 3
            })
        );
        assert!(InvalidIndexError::check(0, 0).is_err());
    }

    #[test]
    fn render_error_messages_name_the_page() {
        let err = PageRenderError::from(InvalidIndexError {
            index: 9,
            page_count: 4,
        });
        assert_eq!(
            err.to_string(),
            "page index 9 out of range for document with 4 pages"
        );
        let err = PageRenderError::Panicked { page: 2 };
        assert_eq!(err.to_string(), "page 2: renderer panicked");
    }
}
