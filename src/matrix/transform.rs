//! Traversal orders and their coordinate maps.
//!
//! A traversal order re-labels every cell so that canonical row-major
//! iteration over the re-labelled coordinates walks the matrix in the
//! alternate order. Under each map, the geometric structure that order
//! targets shows up as a uniform-stride run of columns inside one logical
//! row: a diagonal becomes a delta-1 run, a k-aligned block becomes a
//! contiguous run of length k times its extent.
//!
//! All coordinates are 1-based.

use std::fmt;

/// A traversal order of the matrix. Block variants carry their alignment
/// `k ∈ 2..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IterationOrder {
    Horizontal,
    Vertical,
    Diagonal,
    AntiDiagonal,
    BlockRow(u8),
    BlockCol(u8),
}

/// The fixed enumeration order used for statistics gathering and tie
/// breaking. Block alignments of 1 are degenerate aliases of the linear
/// orders and are never enumerated.
pub const ENUMERATION: [IterationOrder; 18] = [
    IterationOrder::Horizontal,
    IterationOrder::Vertical,
    IterationOrder::Diagonal,
    IterationOrder::AntiDiagonal,
    IterationOrder::BlockRow(2),
    IterationOrder::BlockRow(3),
    IterationOrder::BlockRow(4),
    IterationOrder::BlockRow(5),
    IterationOrder::BlockRow(6),
    IterationOrder::BlockRow(7),
    IterationOrder::BlockRow(8),
    IterationOrder::BlockCol(2),
    IterationOrder::BlockCol(3),
    IterationOrder::BlockCol(4),
    IterationOrder::BlockCol(5),
    IterationOrder::BlockCol(6),
    IterationOrder::BlockCol(7),
    IterationOrder::BlockCol(8),
];

impl IterationOrder {
    /// Stable numeric code, injective across all orders. Used as the kind
    /// component of pattern ids.
    pub fn code(&self) -> u64 {
        match *self {
            IterationOrder::Horizontal => 1,
            IterationOrder::Vertical => 2,
            IterationOrder::Diagonal => 3,
            IterationOrder::AntiDiagonal => 4,
            IterationOrder::BlockRow(k) => 4 + k as u64,
            IterationOrder::BlockCol(k) => 12 + k as u64,
        }
    }

    /// The inverse of [`code`](Self::code).
    pub fn from_code(code: u64) -> Option<IterationOrder> {
        match code {
            1 => Some(IterationOrder::Horizontal),
            2 => Some(IterationOrder::Vertical),
            3 => Some(IterationOrder::Diagonal),
            4 => Some(IterationOrder::AntiDiagonal),
            6..=12 => Some(IterationOrder::BlockRow((code - 4) as u8)),
            14..=20 => Some(IterationOrder::BlockCol((code - 12) as u8)),
            _ => None,
        }
    }

    /// Block alignment for block orders, `None` for linear ones.
    pub fn block_align(&self) -> Option<u64> {
        match *self {
            IterationOrder::BlockRow(k) | IterationOrder::BlockCol(k) => Some(k as u64),
            _ => None,
        }
    }

    /// Dimensions of the transformed coordinate space.
    pub fn transformed_dims(&self, nr_rows: u64, nr_cols: u64) -> (u64, u64) {
        match *self {
            IterationOrder::Horizontal => (nr_rows, nr_cols),
            IterationOrder::Vertical => (nr_cols, nr_rows),
            IterationOrder::Diagonal => {
                ((nr_rows + nr_cols).saturating_sub(1), nr_rows.min(nr_cols))
            }
            IterationOrder::AntiDiagonal => ((nr_rows + nr_cols).saturating_sub(1), nr_rows),
            IterationOrder::BlockRow(k) => {
                let k = k as u64;
                (nr_rows.div_ceil(k), nr_cols * k)
            }
            IterationOrder::BlockCol(k) => {
                let k = k as u64;
                (nr_cols.div_ceil(k), nr_rows * k)
            }
        }
    }

    /// Maps a horizontal-space point `(r, c)` into this order's space.
    pub fn map_point(&self, nr_cols: u64, r: u64, c: u64) -> (u64, u64) {
        match *self {
            IterationOrder::Horizontal => (r, c),
            IterationOrder::Vertical => (c, r),
            IterationOrder::Diagonal => (nr_cols + r - c, r.min(c)),
            IterationOrder::AntiDiagonal => (r + c - 1, r),
            IterationOrder::BlockRow(k) => {
                let k = k as u64;
                ((r - 1) / k + 1, (c - 1) * k + (r - 1) % k + 1)
            }
            IterationOrder::BlockCol(k) => {
                let k = k as u64;
                ((c - 1) / k + 1, (r - 1) * k + (c - 1) % k + 1)
            }
        }
    }

    /// Maps a point of this order's space back to horizontal space.
    pub fn unmap_point(&self, nr_cols: u64, tr: u64, tc: u64) -> (u64, u64) {
        match *self {
            IterationOrder::Horizontal => (tr, tc),
            IterationOrder::Vertical => (tc, tr),
            IterationOrder::Diagonal => {
                // tr = nr_cols + r - c, tc = min(r, c)
                if tr >= nr_cols {
                    (tc + (tr - nr_cols), tc)
                } else {
                    (tc, tc + (nr_cols - tr))
                }
            }
            IterationOrder::AntiDiagonal => (tc, tr + 1 - tc),
            IterationOrder::BlockRow(k) => {
                let k = k as u64;
                ((tr - 1) * k + (tc - 1) % k + 1, (tc - 1) / k + 1)
            }
            IterationOrder::BlockCol(k) => {
                let k = k as u64;
                ((tc - 1) / k + 1, (tr - 1) * k + (tc - 1) % k + 1)
            }
        }
    }
}

impl fmt::Display for IterationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IterationOrder::Horizontal => write!(f, "horizontal"),
            IterationOrder::Vertical => write!(f, "vertical"),
            IterationOrder::Diagonal => write!(f, "diagonal"),
            IterationOrder::AntiDiagonal => write!(f, "anti-diagonal"),
            IterationOrder::BlockRow(k) => write!(f, "block-row-{}", k),
            IterationOrder::BlockCol(k) => write!(f, "block-col-{}", k),
        }
    }
}
