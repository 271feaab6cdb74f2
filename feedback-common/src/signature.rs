//! Request signing for the feedback listing API.
//!
//! Every request carries a `Timestamp` header (seconds since epoch) and a `Signature` header
//! holding the hex MD5 digest of the timestamp immediately followed by the product's private key.
//! The key itself never leaves the process.
use std::fmt;

use thiserror::Error;

use crate::time::{TimeSource, Timestamp};

pub const TIMESTAMP_HEADER: &str = "Timestamp";
pub const SIGNATURE_HEADER: &str = "Signature";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// A product private key.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(key: impl Into<String>) -> Self {
        Secret(key.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

/// Never print the key, not even in debug logs.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// A 32 character lowercase hex digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the signature for a timestamp and a private key.
///
/// Pure and deterministic: the same pair always produces the same digest.
///
/// # Arguments
///
/// * `timestamp`: Decimal seconds since epoch, exactly as it will be sent in the header.
/// * `secret`: The product's private key. Must not be empty.
pub fn sign(timestamp: &str, secret: &str) -> Result<Signature, SignatureError> {
    if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SignatureError::InvalidArgument(format!(
            "timestamp must be a non-negative decimal integer, got {:?}",
            timestamp
        )));
    }

    if secret.is_empty() {
        return Err(SignatureError::InvalidArgument(
            "secret must not be empty".to_owned(),
        ));
    }

    let digest = md5::compute(format!("{}{}", timestamp, secret));

    Ok(Signature(format!("{:x}", digest)))
}

/// The pair of authentication headers attached to a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub timestamp: String,
    pub signature: Signature,
}

impl SignedHeaders {
    pub fn new(timestamp: Timestamp, secret: &Secret) -> Result<Self, SignatureError> {
        let timestamp = timestamp.to_string();
        let signature = sign(&timestamp, secret.expose())?;

        Ok(Self {
            timestamp,
            signature,
        })
    }

    /// Sign with a fresh timestamp taken from `time_source`.
    pub fn now<T: TimeSource + ?Sized>(
        time_source: &T,
        secret: &Secret,
    ) -> Result<Self, SignatureError> {
        Self::new(time_source.current_timestamp(), secret)
    }

    /// Header name, value pairs ready to be attached to a request.
    pub fn pairs(&self) -> [(&'static str, &str); 2] {
        [
            (TIMESTAMP_HEADER, self.timestamp.as_str()),
            (SIGNATURE_HEADER, self.signature.as_str()),
        ]
    }
}
