//! # rigsheet-core
//!
//! Turns raw inventory records into an ordered page plan:
//! - **aggregate**: groups item rows into markers and assigns them to vehicle views
//! - **plan**: decides, per view, between a photo page and paginated table pages
//! - **style**: theme tokens shared by both renderers
//! - **error**: content errors raised while planning
//!
//! Nothing here renders. The plan fully determines the document before a
//! renderer runs, so both renderers produce the same sequence of pages.

// Re-export foundation crates
pub use rigsheet_layout as layout;
pub use rigsheet_resource as resource;
pub use rigsheet_types as types;

pub mod aggregate;
pub mod error;
pub mod plan;
pub mod style;

pub use aggregate::{FALLBACK_CATEGORY_NAME, build_vehicle_views};
pub use error::PlanError;
pub use plan::{PageKind, PagePlan, PageSummary, PlannedPage, build_plan};
pub use style::{FontSizes, Palette, Theme};
