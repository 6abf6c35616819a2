//! The single source of truth for all encoder configuration.
//!
//! This module defines the unified `EncoderConfig` struct, designed to be
//! created once at the application boundary (e.g., from a user's YAML file)
//! and then passed down through the system read-only.

use serde::{Deserialize, Serialize};

use crate::csx::CTL_SIZE_MAX;

/// Tuning knobs for pattern detection and admission.
///
/// The defaults mirror what works well for general sparse matrices: runs
/// shorter than four cells are not worth a pattern header, and a delta whose
/// coverage is below ten percent of the non-zeros is noise.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    /// Minimum run length considered a pattern.
    pub min_limit: u64,

    /// Maximum cells a single pattern descriptor may cover. Bounded above by
    /// the one-byte ctl size field; longer physical runs are split into
    /// back-to-back descriptors.
    pub max_limit: u64,

    /// Admission cutoff: a delta survives statistics filtering only if it
    /// covers at least this fraction of the matrix's non-zeros.
    pub min_perc: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            min_limit: 4,
            max_limit: CTL_SIZE_MAX as u64,
            min_perc: 0.1,
        }
    }
}
