use serde::{Deserialize, Serialize};

/// A4 short edge in PDF points.
pub const A4_SHORT_EDGE: f32 = 595.28;
/// A4 long edge in PDF points.
pub const A4_LONG_EDGE: f32 = 841.89;

/// An axis-aligned rectangle in page units. The origin is the top-left corner
/// and `y` grows downward; renderers flip to PDF space at draw time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict intersection test: rectangles sharing only an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Maps a ratio pair in `[0, 1]` to a point inside the rectangle.
    pub fn point_at(&self, ratio_x: f32, ratio_y: f32) -> Point {
        Point::new(
            self.x + ratio_x * self.width,
            self.y + ratio_y * self.height,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    #[default]
    Landscape,
}

impl Orientation {
    /// Picks the orientation matching a source image's aspect ratio.
    /// Square images are treated as landscape.
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if width >= height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// A4 page size in points for this orientation.
    pub fn page_size(self) -> Size {
        match self {
            Orientation::Portrait => Size::new(A4_SHORT_EDGE, A4_LONG_EDGE),
            Orientation::Landscape => Size::new(A4_LONG_EDGE, A4_SHORT_EDGE),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.5, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn orientation_follows_aspect_ratio() {
        assert_eq!(Orientation::for_dimensions(400, 300), Orientation::Landscape);
        assert_eq!(Orientation::for_dimensions(300, 400), Orientation::Portrait);
        assert_eq!(Orientation::for_dimensions(300, 300), Orientation::Landscape);
        let size = Orientation::Portrait.page_size();
        assert!(size.height > size.width);
    }
}
