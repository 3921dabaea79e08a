use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("task {0} not found")]
    NotFound(i64),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl Error {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    /// True for errors caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_task() {
        assert_eq!(Error::NotFound(42).to_string(), "task 42 not found");
    }

    #[test]
    fn store_errors_are_not_client_errors() {
        let err = Error::from(rusqlite::Error::InvalidQuery);
        assert!(!err.is_client_error());
        assert!(Error::validation("bad").is_client_error());
        assert!(Error::NotFound(1).is_client_error());
    }
}
