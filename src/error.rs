use thiserror::Error;

/// Failures raised by document validation, frame extraction, and merging.
/// All of them are recoverable at the session level; the interactive shell
/// reports them and returns to a menu.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// One of the structural gate checks failed. Callers attach the file name.
    #[error("schema check failed: {reason}")]
    Schema { reason: String },

    /// A page's frame data cannot be normalized; its preview shows blank.
    #[error("malformed page {page_index}: {reason}")]
    MalformedPage { page_index: u64, reason: String },

    /// A merge selection cannot supply its target page; nothing is written.
    #[error("cannot fill page {target_page}: {reason}")]
    Incompatible { target_page: usize, reason: String },
}

impl DocumentError {
    pub fn schema(reason: impl Into<String>) -> Self {
        Self::Schema {
            reason: reason.into(),
        }
    }

    pub fn malformed_page(page_index: u64, reason: impl Into<String>) -> Self {
        Self::MalformedPage {
            page_index,
            reason: reason.into(),
        }
    }

    pub fn incompatible(target_page: usize, reason: impl Into<String>) -> Self {
        Self::Incompatible {
            target_page,
            reason: reason.into(),
        }
    }
}
