use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature: empty input")]
    EmptyInput,

    /// The generator found no usable face or content signal in the image.
    #[error("signature: no usable signal: {0}")]
    NoSignal(String),

    #[error("signature: timeout: {0}")]
    Timeout(String),

    #[error("signature: API error: {0}")]
    Api(String),

    #[error("signature: invalid response: {0}")]
    InvalidResponse(String),
}

impl SignatureError {
    /// Returns true for failures worth retrying.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SignatureError::Timeout(_))
    }
}

impl From<reqwest::Error> for SignatureError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SignatureError::Timeout(e.to_string())
        } else {
            SignatureError::Api(e.to_string())
        }
    }
}
