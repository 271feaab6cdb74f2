use feedback_common::flatten::FlattenError;
use feedback_common::page::ShapeError;
use feedback_common::signature::SignatureError;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Enumeration of errors a `PageFetcher` can return for a single request.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to reach upstream: {0}")]
    Transport(#[source] BoxError),
    #[error("upstream responded with {status} {status_text}")]
    Upstream { status: u16, status_text: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<ShapeError> for FetchError {
    fn from(error: ShapeError) -> Self {
        FetchError::Malformed(error.to_string())
    }
}

/// Enumeration of errors that abort an export run.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("request failed: {0}")]
    Transport(#[source] BoxError),
    #[error("request failed: {status} {status_text}")]
    Upstream { status: u16, status_text: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("listing did not end after {0} pages")]
    PageLimitExceeded(usize),
}

impl From<FetchError> for ExportError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Transport(error) => ExportError::Transport(error),
            FetchError::Upstream {
                status,
                status_text,
            } => ExportError::Upstream {
                status,
                status_text,
            },
            FetchError::Malformed(msg) => ExportError::MalformedResponse(msg),
        }
    }
}

impl From<SignatureError> for ExportError {
    fn from(error: SignatureError) -> Self {
        match error {
            SignatureError::InvalidArgument(msg) => ExportError::InvalidArgument(msg),
        }
    }
}

impl From<FlattenError> for ExportError {
    fn from(error: FlattenError) -> Self {
        ExportError::MalformedResponse(error.to_string())
    }
}

/// Enumeration of errors raised while writing the export archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to write archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write sheet: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write zip entry: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to serialize raw feedback: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_keep_their_kind() {
        let upstream = ExportError::from(FetchError::Upstream {
            status: 403,
            status_text: "Forbidden".to_owned(),
        });
        assert_eq!(upstream.to_string(), "request failed: 403 Forbidden");

        let malformed = ExportError::from(FetchError::from(ShapeError::NotAnObject));
        assert!(matches!(malformed, ExportError::MalformedResponse(_)));

        let transport = ExportError::from(FetchError::Transport(Box::new(
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        )));
        assert!(matches!(transport, ExportError::Transport(_)));
    }

    #[test]
    fn test_signature_errors_are_invalid_arguments() {
        let error = ExportError::from(SignatureError::InvalidArgument("empty".to_owned()));

        assert!(matches!(error, ExportError::InvalidArgument(msg) if msg == "empty"));
    }
}
