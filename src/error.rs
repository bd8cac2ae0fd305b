use std::fmt;

/// Errors returned by digest operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A non-finite value was offered where a finite one is required.
    ///
    /// `context` names the argument, e.g. "added value" or "quantile".
    InvalidValue {
        /// Where the value came from.
        context: &'static str,
    },

    /// A query was made against a digest that has observed no values.
    EmptyDigest,

    /// Two digests cannot be combined, or a decoded digest breaks the centroid invariants.
    IncompatibleDigest {
        /// What did not match.
        reason: String,
    },

    /// The digest configuration is unusable.
    InvalidConfig {
        /// Which setting was rejected.
        what: &'static str,
    },

    /// The binary form could not be framed.
    Wire(WireError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidValue { context } => {
                write!(f, "non-finite values are not allowed ({context})")
            }
            Error::EmptyDigest => write!(f, "digest is empty"),
            Error::IncompatibleDigest { reason } => write!(f, "incompatible digest: {reason}"),
            Error::InvalidConfig { what } => write!(f, "invalid configuration: {what}"),
            Error::Wire(err) => write!(f, "wire format: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Wire(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WireError> for Error {
    fn from(err: WireError) -> Self {
        Error::Wire(err)
    }
}

/// Framing errors of the binary digest format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// The buffer does not start with the digest magic.
    InvalidMagic,
    /// The format version is not understood by this build.
    UnsupportedVersion(u8),
    /// The scale code does not name a known scale family.
    InvalidScale(u8),
    /// The buffer ended before the header did.
    Truncated,
    /// The payload length disagrees with the centroid count in the header.
    LengthMismatch {
        /// Bytes the header promises.
        expected: usize,
        /// Bytes actually present.
        found: usize,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::InvalidMagic => write!(f, "invalid magic header"),
            WireError::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            WireError::InvalidScale(c) => write!(f, "invalid scale code: {c}"),
            WireError::Truncated => write!(f, "buffer too short for header"),
            WireError::LengthMismatch { expected, found } => {
                write!(f, "payload length mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for WireError {}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
