pub mod color;
pub mod geometry;
pub mod inventory;
pub mod options;
pub mod view;

pub use color::Color;
pub use geometry::{Orientation, Point, Rect, Size};
pub use inventory::{Category, Item, PointerTarget, PointerTargets, ViewConfig};
pub use options::ExportOptions;
pub use view::{DEFAULT_VIEW_NAME, VehicleView, VehicleViewEntry, normalize_view_name};
