//! Greedy first-fit pagination of rasterized blocks
//!
//! Blocks are scaled to the full content width and stacked down the page
//! with a fixed gutter. A block that would cross the bottom margin starts
//! a new page first; a block taller than a whole page is still placed in
//! full and simply overflows that one page. Blocks are never split.
//!
//! The dedicated cover and screenshot pages are built outside the greedy
//! cursor flow ([`single_block_page`] and [`screenshot_page`]); the
//! exporter splices the screenshot page into the fixed second slot so the
//! content flow keeps page one and continues from page three.

use crate::raster::BlockBitmap;

/// Millimeters, the physical page unit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Mm(pub f32);

impl Mm {
    /// Convert to PDF points (1 in = 25.4 mm = 72 pt).
    pub fn to_points(self) -> f32 {
        self.0 * 72.0 / 25.4
    }
}

impl std::ops::Add for Mm {
    type Output = Mm;
    fn add(self, rhs: Mm) -> Mm {
        Mm(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Mm {
    fn add_assign(&mut self, rhs: Mm) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Mm {
    type Output = Mm;
    fn sub(self, rhs: Mm) -> Mm {
        Mm(self.0 - rhs.0)
    }
}

impl std::ops::Mul<f32> for Mm {
    type Output = Mm;
    fn mul(self, rhs: f32) -> Mm {
        Mm(self.0 * rhs)
    }
}

/// Fixed page geometry: A4 with uniform margins and an inter-block gutter.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub page_width: Mm,
    pub page_height: Mm,
    pub margin: Mm,
    pub gutter: Mm,
}

impl PageGeometry {
    pub const fn a4() -> Self {
        Self {
            page_width: Mm(210.0),
            page_height: Mm(297.0),
            margin: Mm(20.0),
            gutter: Mm(5.0),
        }
    }

    /// Horizontal span available to content.
    pub fn content_width(&self) -> Mm {
        self.page_width - self.margin * 2.0
    }

    /// Vertical span available to content.
    pub fn content_height(&self) -> Mm {
        self.page_height - self.margin * 2.0
    }

    /// Lowest allowed bottom edge for a placed block.
    pub fn flow_limit(&self) -> Mm {
        self.page_height - self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// A bitmap placed on a page at absolute coordinates.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub bitmap: BlockBitmap,
    pub x: Mm,
    pub y: Mm,
    pub width: Mm,
    pub height: Mm,
}

/// One output page; an empty page is legal and must be preserved.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub images: Vec<PlacedImage>,
}

/// The finalized, ordered page sequence.
#[derive(Debug, Clone)]
pub struct OutputDocument {
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
}

/// Where a block landed in the content flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page: usize,
    pub y: Mm,
}

/// Cursor-driven accumulator for the content flow.
#[derive(Debug)]
pub struct Paginator {
    geometry: PageGeometry,
    pages: Vec<Page>,
    cursor_y: Mm,
}

impl Paginator {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::default()],
            cursor_y: geometry.margin,
        }
    }

    pub fn cursor_y(&self) -> Mm {
        self.cursor_y
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Place one rasterized block, breaking the page first when it would
    /// cross the bottom margin. The block is scaled to the full content
    /// width preserving its aspect ratio; no lookahead, no splitting.
    pub fn place(&mut self, bitmap: BlockBitmap) -> Placement {
        let width = self.geometry.content_width();
        let height = if bitmap.width == 0 {
            Mm(0.0)
        } else {
            Mm(width.0 * bitmap.height as f32 / bitmap.width as f32)
        };

        if self.cursor_y + height > self.geometry.flow_limit() {
            self.pages.push(Page::default());
            self.cursor_y = self.geometry.margin;
        }

        let page_index = self.pages.len() - 1;
        let placement = Placement {
            page: page_index,
            y: self.cursor_y,
        };
        self.pages[page_index].images.push(PlacedImage {
            bitmap,
            x: self.geometry.margin,
            y: self.cursor_y,
            width,
            height,
        });
        self.cursor_y += height + self.geometry.gutter;
        placement
    }

    /// Hand back the accumulated content pages in order.
    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

/// Build a stand-alone page holding one block scaled to content width,
/// anchored at the top margin. Used for the cover.
pub fn single_block_page(geometry: &PageGeometry, bitmap: BlockBitmap) -> Page {
    let width = geometry.content_width();
    let height = if bitmap.width == 0 {
        Mm(0.0)
    } else {
        Mm(width.0 * bitmap.height as f32 / bitmap.width as f32)
    };
    Page {
        images: vec![PlacedImage {
            bitmap,
            x: geometry.margin,
            y: geometry.margin,
            width,
            height,
        }],
    }
}

/// Build the dedicated screenshot page: the image is fitted inside the
/// content box preserving aspect ratio and centered horizontally, placed
/// independently of the text cursor.
pub fn screenshot_page(geometry: &PageGeometry, bitmap: BlockBitmap) -> Page {
    if bitmap.width == 0 || bitmap.height == 0 {
        return Page::default();
    }
    let max_w = geometry.content_width();
    let max_h = geometry.content_height();
    let scale = (max_w.0 / bitmap.width as f32).min(max_h.0 / bitmap.height as f32);
    let width = Mm(bitmap.width as f32 * scale);
    let height = Mm(bitmap.height as f32 * scale);
    let x = geometry.margin + Mm((max_w.0 - width.0) / 2.0);
    Page {
        images: vec![PlacedImage {
            bitmap,
            x,
            y: geometry.margin,
            width,
            height,
        }],
    }
}
