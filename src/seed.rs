//! Reproduce settings: a portable token that pins down everything needed to
//! replay a failing run (spec.md §6, §8 property 8).
//!
//! The token is a base64 encoding of a small JSON document rather than a raw
//! integer, so it can grow additional fields (e.g. a strategy discriminant)
//! without breaking the encoding of tokens minted by older versions of this
//! crate — old tokens just decode with the new fields defaulted.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Everything needed to deterministically replay one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReproduceSettings {
    /// The top-level seed the failing invocation was generated from.
    pub seed: u64,
}

impl ReproduceSettings {
    /// Wraps a raw seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Encodes as a URL-safe-ish opaque token (base64 of compact JSON).
    ///
    /// # Panics
    ///
    /// Never: the payload is a fixed-shape struct of primitive fields, so
    /// JSON serialization cannot fail.
    #[must_use]
    pub fn encode(self) -> String {
        let json = serde_json::to_vec(&self).expect("ReproduceSettings is always serializable");
        BASE64.encode(json)
    }

    /// Decodes a token produced by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReproduceSettings`] if `token` is not valid
    /// base64, or the decoded bytes are not a valid `ReproduceSettings`
    /// document.
    pub fn decode(token: &str) -> Result<Self, Error> {
        let bytes = BASE64
            .decode(token.trim())
            .map_err(|e| Error::InvalidReproduceSettings(format!("not valid base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidReproduceSettings(format!("not a valid settings document: {e}")))
    }
}

impl std::fmt::Display for ReproduceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}
