use thiserror::Error;

use crate::codec::CodecError;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("redirect from {0} has no usable location")]
    MissingLocation(String),
    #[error("landing page without a target id: {0}")]
    MissingLandingTarget(String),
    #[error("gave up after {0} hops")]
    TooManyHops(usize),
    #[error("no stream url found in page {0}")]
    PatternNotFound(String),
    #[error("invalid token: {0}")]
    Decode(#[from] CodecError),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
}

/// Coarse failure classes. Callers of the resolver only ever see `Failed`;
/// these exist for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Decode,
    Network,
    PatternNotFound,
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::Decode(_) => FailureKind::Decode,
            ResolveError::PatternNotFound(_) => FailureKind::PatternNotFound,
            _ => FailureKind::Network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn test_kind_mapping() {
        let decode = codec::try_decode("Y").unwrap_err();
        assert_eq!(ResolveError::from(decode).kind(), FailureKind::Decode);
        assert_eq!(
            ResolveError::PatternNotFound("https://example.com".into()).kind(),
            FailureKind::PatternNotFound
        );
        assert_eq!(ResolveError::TooManyHops(10).kind(), FailureKind::Network);
        assert_eq!(
            ResolveError::Status {
                status: 404,
                url: "https://example.com".into()
            }
            .kind(),
            FailureKind::Network
        );
    }
}
