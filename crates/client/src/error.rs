use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("url error: {0}")]
    Url(String),
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("local-only images cannot be downloaded")]
    LocalOnlyDownload,
    #[error("no card at index {0}")]
    NoSuchCard(usize),
    #[error("invalid resolver config: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else if e.is_decode() {
        ClientError::Serde(e.to_string())
    } else {
        ClientError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retried() {
        assert!(ClientError::Timeout.should_retry());
        assert!(ClientError::Transport("connection refused".into()).should_retry());
        assert!(
            ClientError::Http {
                status: 503,
                body: String::new()
            }
            .should_retry()
        );
        assert!(
            !ClientError::Http {
                status: 400,
                body: "{\"error\":\"No file uploaded\"}".into()
            }
            .should_retry()
        );
        assert!(!ClientError::Rejected("Unknown server error".into()).should_retry());
        assert!(!ClientError::LocalOnlyDownload.should_retry());
    }
}
