use rigsheet_resource::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF generation error: {0}")]
    Pdf(String),
    #[error("Image preprocessing error: {0}")]
    Image(#[from] CacheError),
    #[error("Browser engine failed: {0}")]
    Browser(String),
    #[error("Browser engine did not finish within {0} seconds")]
    Timeout(u64),
    #[error("Renderer unavailable: {hint}")]
    Unavailable { hint: String },
    /// The export was cancelled at a checkpoint. Not a failure.
    #[error("Rendering cancelled")]
    Cancelled,
    #[error("Table page holds {total} rows but only {drawn} fit the page body")]
    TableOverflow { drawn: usize, total: usize },
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}

impl From<lopdf::Error> for RenderError {
    fn from(err: lopdf::Error) -> Self {
        RenderError::Pdf(err.to_string())
    }
}
