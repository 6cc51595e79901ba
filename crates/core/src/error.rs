//! Content errors. These describe the input, so retrying with another
//! renderer cannot fix them.

use rigsheet_resource::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("No content to export: every view is empty and has no background photo.")]
    NoContent,
    #[error("Missing background asset for view '{view}' of '{category}': the configured photo file could not be found.")]
    MissingBackground { category: String, view: String },
    #[error("Background image could not be read: {0}")]
    Image(#[from] CacheError),
}
