//! This module defines the single, unified error type for the entire csx
//! library.
//!
//! By using a single error enum, errors from any kernel or encoder stage can
//! be propagated all the way up to the public API. The `thiserror` crate is
//! used to reduce boilerplate. Every error here is fatal to the encode
//! operation: the encoder aborts rather than returning a half-built matrix.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsxError {
    /// The ctl flag space (6 bits) ran out of distinct pattern flags.
    /// The caller must lower `max_limit` or raise the admission threshold.
    #[error("too many distinct patterns: flag space of {0} exhausted")]
    TooManyPatterns(usize),

    /// A single ctl unit would describe more cells than its one-byte size
    /// field can hold.
    #[error("unit too large: {0} cells exceeds the ctl size limit")]
    UnitTooLarge(usize),

    /// A pattern stride too wide for the numeric pattern-id space.
    #[error("pattern delta {0} does not fit the pattern-id space")]
    PatternDeltaTooWide(u64),

    #[error("LEB128 decoding error: {0}")]
    Leb128Decode(String),

    #[error("ctl stream decoding error: {0}")]
    CtlDecode(String),

    /// An encoder invariant was violated (this is a bug).
    #[error("internal logic error (this is a bug): {0}")]
    Internal(String),
}
