//! Core types for windowed page rendering

use std::sync::Arc;

use image::{Rgb, RgbImage};

use super::request::PageRenderError;

/// Rendered page bitmap (packed RGB, 3 bytes per pixel)
pub type Bitmap = RgbImage;

/// Background colour of the placeholder shown for pages not yet rendered
pub const PLACEHOLDER_RGB: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);

/// Raw page raster as produced by a document engine.
///
/// This is the intermediate format between the engine and the cache: it
/// carries no guarantee that `pixels` matches the declared dimensions until
/// [`RasterPage::into_bitmap`] has checked it.
#[derive(Clone)]
pub struct RasterPage {
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
    /// Raw RGB pixel data (3 bytes per pixel: R, G, B)
    pub pixels: Vec<u8>,
}

impl RasterPage {
    /// Wrap the raster into a bitmap, validating the buffer size
    pub fn into_bitmap(self, page: usize) -> Result<Bitmap, PageRenderError> {
        let (width, height) = (self.width, self.height);
        let actual = self.pixels.len();
        RgbImage::from_raw(width, height, self.pixels).ok_or(PageRenderError::BufferMismatch {
            page,
            width,
            height,
            actual,
        })
    }
}

impl std::fmt::Debug for RasterPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterPage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels_len", &self.pixels.len())
            .finish()
    }
}

/// Per-page cache cell
#[derive(Clone, Default)]
pub enum PageSlot {
    #[default]
    Empty,
    Loaded(Arc<Bitmap>),
}

impl PageSlot {
    #[must_use]
    pub fn loaded(bitmap: Bitmap) -> Self {
        Self::Loaded(Arc::new(bitmap))
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    #[must_use]
    pub fn bitmap(&self) -> Option<&Arc<Bitmap>> {
        match self {
            Self::Loaded(bitmap) => Some(bitmap),
            Self::Empty => None,
        }
    }
}

impl std::fmt::Debug for PageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Loaded(bitmap) => write!(f, "Loaded({}x{})", bitmap.width(), bitmap.height()),
        }
    }
}

/// Build the shared placeholder raster for a document whose first page
/// measures `size`; empty documents get a 0x0 placeholder
#[must_use]
pub fn placeholder_bitmap(size: Option<(u32, u32)>) -> Bitmap {
    let (width, height) = size.unwrap_or((0, 0));
    RgbImage::from_pixel(width, height, PLACEHOLDER_RGB)
}

/// Extension trait for Vec operations
pub trait VecExt<T> {
    /// Reset vector to a given length, clearing existing items
    fn reset_to_len(&mut self, len: usize)
    where
        T: Default;
}

impl<T> VecExt<T> for Vec<T> {
    #[inline]
    fn reset_to_len(&mut self, len: usize)
    where
        T: Default,
    {
        self.clear();
        self.resize_with(len, T::default);
    }
}
