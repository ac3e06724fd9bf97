use thiserror::Error;

use crate::pipeline::Stage;

/// Failures that end a relay run.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The synthesis provider answered with a non-2xx status.
    #[error("provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The provider could not be reached or did not answer in time.
    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("invalid pipeline transition from {from:?} to {to:?}")]
    InvalidTransition { from: Stage, to: Stage },
}

impl RelayError {
    /// Upstream status when the provider answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            RelayError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors that originate at the synthesis provider.
    pub fn is_upstream(&self) -> bool {
        matches!(self, RelayError::Upstream { .. } | RelayError::Transport(_))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            RelayError::Upstream {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            RelayError::Transport(e.to_string())
        }
    }
}

impl From<zip::result::ZipError> for RelayError {
    fn from(e: zip::result::ZipError) -> Self {
        RelayError::Archive(e.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Archive(e.to_string())
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
