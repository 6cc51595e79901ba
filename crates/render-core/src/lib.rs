//! Core rendering abstractions for inventory sheet exports.
//!
//! This crate provides what both rendering backends share:
//! - `PageRenderer` trait turning a page plan into PDF bytes
//! - `RenderContext` with the image cache, cancellation token and progress sink
//! - Error types for rendering operations
//! - Shared helpers for coordinates, text encoding and page chrome labels

mod context;
mod error;
mod traits;
pub mod utils;

pub use context::{CancellationToken, NoProgress, ProgressSink, RenderContext};
pub use error::RenderError;
pub use traits::PageRenderer;
