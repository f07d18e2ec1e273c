//! Document engine contract
//!
//! The render lane owns the document exclusively. Engines such as MuPDF hand
//! out handles that must stay on the thread that opened them, so documents are
//! opened *on* the lane through a [`DocumentOpener`].

use std::path::PathBuf;

use super::request::{DocumentOpenError, PageRenderError};
use super::types::RasterPage;

/// An open, paginated document
pub trait Document {
    /// Number of pages; fixed for the lifetime of the handle
    fn page_count(&self) -> usize;

    /// Pixel size `render` will produce for a page
    fn page_size(&self, page: usize) -> Result<(u32, u32), PageRenderError>;

    /// Rasterize a page. Calling this outside `[0, page_count)` is a contract
    /// violation reported as [`PageRenderError::InvalidIndex`].
    fn render(&mut self, page: usize) -> Result<RasterPage, PageRenderError>;

    /// Release engine resources. Idempotent.
    fn close(&mut self);
}

/// Deferred document construction, run on the render lane
pub type DocumentOpener =
    Box<dyn FnOnce() -> Result<Box<dyn Document>, DocumentOpenError> + Send + 'static>;

/// Where document bytes come from
#[derive(Clone, Debug)]
pub enum DocumentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

#[cfg(feature = "pdf")]
pub use self::mupdf_backend::MupdfDocument;

#[cfg(feature = "pdf")]
mod mupdf_backend {
    use log::{debug, info};
    use mupdf::{Colorspace, Matrix, Pixmap};

    use super::super::request::{DocumentOpenError, InvalidIndexError, PageRenderError};
    use super::super::types::RasterPage;
    use super::{Document, DocumentOpener, DocumentSource};

    const PDF_MAGIC: &str = "application/pdf";

    /// MuPDF-backed document rendering RGB rasters
    pub struct MupdfDocument {
        doc: Option<mupdf::Document>,
        page_count: usize,
        /// Output width in pixels; `None` renders at the page's native size
        target_width: Option<u32>,
    }

    impl MupdfDocument {
        /// Open a document from a path or an in-memory buffer
        pub fn open(
            source: &DocumentSource,
            target_width: Option<u32>,
        ) -> Result<Self, DocumentOpenError> {
            let doc = match source {
                DocumentSource::Path(path) => {
                    mupdf::Document::open(path.to_string_lossy().as_ref())
                }
                DocumentSource::Bytes(bytes) => mupdf::Document::from_bytes(bytes, PDF_MAGIC),
            }
            .map_err(|e| DocumentOpenError::Engine(e.to_string()))?;

            let page_count = doc
                .page_count()
                .map_err(|e| DocumentOpenError::Engine(e.to_string()))?;
            let page_count = usize::try_from(page_count).unwrap_or(0);
            info!("Opened document with {page_count} pages");

            Ok(Self {
                doc: Some(doc),
                page_count,
                target_width: target_width.filter(|w| *w > 0),
            })
        }

        /// Opener to hand to the render lane
        #[must_use]
        pub fn opener(source: DocumentSource, target_width: Option<u32>) -> DocumentOpener {
            Box::new(move || {
                Self::open(&source, target_width).map(|doc| Box::new(doc) as Box<dyn Document>)
            })
        }

        fn load_page(&self, page: usize) -> Result<mupdf::Page, PageRenderError> {
            InvalidIndexError::check(page, self.page_count)?;
            let doc = self
                .doc
                .as_ref()
                .ok_or_else(|| PageRenderError::engine("document is closed"))?;
            doc.load_page(page as i32)
                .map_err(|e| PageRenderError::engine(e.to_string()))
        }

        fn scale_for(&self, page_width: f32) -> f32 {
            match self.target_width {
                Some(width) if page_width > 0.0 => width as f32 / page_width,
                _ => 1.0,
            }
        }
    }

    impl Document for MupdfDocument {
        fn page_count(&self) -> usize {
            self.page_count
        }

        fn page_size(&self, page: usize) -> Result<(u32, u32), PageRenderError> {
            let bounds = self
                .load_page(page)?
                .bounds()
                .map_err(|e| PageRenderError::engine(e.to_string()))?;
            let (width, height) = (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);
            let scale = self.scale_for(width);
            Ok((
                (width * scale).round() as u32,
                (height * scale).round() as u32,
            ))
        }

        fn render(&mut self, page: usize) -> Result<RasterPage, PageRenderError> {
            let loaded = self.load_page(page)?;
            let bounds = loaded
                .bounds()
                .map_err(|e| PageRenderError::engine(e.to_string()))?;
            let scale = self.scale_for(bounds.x1 - bounds.x0);

            let rgb = Colorspace::device_rgb();
            let pixmap = loaded
                .to_pixmap(&Matrix::new_scale(scale, scale), &rgb, false, false)
                .map_err(|e| PageRenderError::engine(e.to_string()))?;

            Ok(RasterPage {
                width: pixmap.width(),
                height: pixmap.height(),
                pixels: pixmap_to_rgb(&pixmap)?,
            })
        }

        fn close(&mut self) {
            if self.doc.take().is_some() {
                debug!("Closed document");
            }
        }
    }

    fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, PageRenderError> {
        let n = pixmap.n() as usize;
        if n < 3 {
            return Err(PageRenderError::engine(format!(
                "Unsupported pixmap format: {n} channels"
            )));
        }

        let width = pixmap.width() as usize;
        let height = pixmap.height() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        let row_bytes = width * n;
        if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
            return Err(PageRenderError::engine("Pixmap buffer size mismatch"));
        }

        let mut out = Vec::with_capacity(width * height * 3);
        for row in samples.chunks(stride).take(height) {
            let row = &row[..row_bytes];
            if n == 3 {
                out.extend_from_slice(row);
            } else {
                for px in row.chunks_exact(n) {
                    out.extend_from_slice(&px[..3]);
                }
            }
        }
        Ok(out)
    }
}
