pub mod bubbles;
pub mod frame;
pub mod text;

pub use self::bubbles::{
    ANCHOR_DOT_RADIUS, BUBBLE_HEIGHT, BUBBLE_PADDING, BUBBLE_WIDTH, BubbleLayoutEngine,
    BubblePlacement, Connector, MAX_ATTEMPTS, layout_bubbles,
};
pub use self::frame::{BACKGROUND_ASPECT, Margins, PageMetrics, fit_aspect, fit_image};
pub use self::text::{FontWeight, ellipsize, text_width, wrap_text};

// Re-export geometry so renderers only need one import path
pub use rigsheet_types::geometry::{Point, Rect, Size};
