//! Typed errors for source fetch paths.
//!
//! These never cross the public API boundary: adapters catch them, log, and
//! degrade to "no result". They exist so fetch internals can say *why* a
//! source produced nothing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Symbol has no configured mapping for this source; fail closed.
    #[error("symbol {0} is not supported by this source")]
    UnsupportedSymbol(String),

    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid price {0}")]
    InvalidPrice(f64),
}
