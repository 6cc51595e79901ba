//! Page regions: the content area left between header and footer chrome, and
//! the frame a background photo is fitted into.

use rigsheet_types::geometry::{Rect, Size};

/// Photos are presented in a fixed 16:9 frame centered in the content area.
pub const BACKGROUND_ASPECT: f32 = 16.0 / 9.0;

const MM: f32 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// Builds margins from millimetre values, stored in points.
    pub fn from_mm(left: f32, top: f32, bottom: f32, right: f32) -> Self {
        Self {
            top: top * MM,
            right: right * MM,
            bottom: bottom * MM,
            left: left * MM,
        }
    }
}

/// Margin and chrome heights that frame every page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub margins: Margins,
    pub header_height: f32,
    pub footer_height: f32,
}

impl PageMetrics {
    /// The region available for the photo or table on a page of `page` size.
    pub fn content_bounds(&self, page: Size) -> Rect {
        let m = &self.margins;
        Rect::new(
            m.left,
            self.header_height + m.top,
            (page.width - m.left - m.right).max(0.0),
            (page.height - self.header_height - self.footer_height - m.top - m.bottom).max(0.0),
        )
    }

    /// Band across the top of the page holding the document title.
    pub fn header_band(&self, page: Size) -> Rect {
        Rect::new(0.0, 0.0, page.width, self.header_height)
    }

    /// Band above the bottom margin holding the footer label.
    pub fn footer_band(&self, page: Size) -> Rect {
        Rect::new(
            self.margins.left,
            page.height - self.margins.bottom - self.footer_height,
            (page.width - self.margins.left - self.margins.right).max(0.0),
            self.footer_height,
        )
    }
}

/// Largest rectangle of the given aspect ratio centered in `bounds`.
pub fn fit_aspect(bounds: Rect, aspect: f32) -> Rect {
    let mut width = bounds.width;
    let mut height = width / aspect;
    if height > bounds.height {
        height = bounds.height;
        width = height * aspect;
    }
    Rect::new(
        bounds.x + (bounds.width - width) / 2.0,
        bounds.y + (bounds.height - height) / 2.0,
        width,
        height,
    )
}

/// Where an image of `image_w` x `image_h` pixels lands when scaled to fit
/// inside `frame` without cropping.
pub fn fit_image(frame: Rect, image_w: u32, image_h: u32) -> Rect {
    if image_w == 0 || image_h == 0 {
        return frame;
    }
    fit_aspect(frame, image_w as f32 / image_h as f32)
}
