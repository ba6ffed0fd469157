use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlytError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transient upstream error: {0}")]
    TransientUpstream(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("authorization required: {0}")]
    AuthRequired(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("transfer cancelled")]
    Cancelled,
}

impl PlytError {
    /// Errors worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUpstream(_) | Self::Network(_))
    }

    /// Errors that end a whole run once matching has started. Past listing,
    /// `NotFound` refers to a single item and is not included.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::QuotaExceeded(_) | Self::AuthRequired(_) | Self::Config(_) | Self::Cancelled
        )
    }
}

pub type PlytResult<T> = Result<T, PlytError>;

#[cfg(test)]
mod tests {
    use super::PlytError;

    #[test]
    fn transient_covers_network_and_upstream() {
        assert!(PlytError::TransientUpstream("503".into()).is_transient());
        assert!(PlytError::Network("reset".into()).is_transient());
        assert!(!PlytError::QuotaExceeded("daily".into()).is_transient());
        assert!(!PlytError::Api("bad filter".into()).is_transient());
    }

    #[test]
    fn per_item_failures_are_not_run_fatal() {
        assert!(!PlytError::TransientUpstream("503".into()).is_run_fatal());
        assert!(!PlytError::Api("forbidden".into()).is_run_fatal());
        assert!(PlytError::QuotaExceeded("daily".into()).is_run_fatal());
        assert!(PlytError::AuthRequired("expired".into()).is_run_fatal());
        assert!(!PlytError::NotFound("videoNotFound".into()).is_run_fatal());
    }
}
