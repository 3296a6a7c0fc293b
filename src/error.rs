use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetitleError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("title '{0}' is reserved")]
    ReservedTitle(String),

    #[error("title '{0}' is already in use")]
    DuplicateTitle(String),

    #[error("path '{slug}' already belongs to content {logical_id}")]
    SlugConflict { slug: String, logical_id: i64 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Persistence(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("render failed: {0}")]
    Render(String),
}

impl RetitleError {
    /// Rejected before anything was written; safe to show the user.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RetitleError::EmptyTitle
                | RetitleError::ReservedTitle(_)
                | RetitleError::DuplicateTitle(_)
                | RetitleError::SlugConflict { .. }
        )
    }
}
