//! The statistics engine: one pass over the matrix per candidate traversal
//! order, counting pattern candidates per delta.
//!
//! A row's singleton columns are collected into a scratch buffer; a cell
//! that already carries a pattern (from a previous encoding pass) flushes
//! the buffer, as does the end of the row. Each flush runs the buffer
//! through delta+RLE and scores the resulting records.

use std::collections::BTreeMap;

use crate::kernels::{delta, rle};
use crate::matrix::{Cell, SparseMatrix};

/// Accumulated evidence for one delta under one traversal order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeltaStats {
    /// Non-zeros covered by candidate runs of this delta.
    pub nnz: u64,
    /// Number of candidate run instances.
    pub npatterns: u64,
}

/// Per-order statistics: delta -> evidence.
pub type StatsTable = BTreeMap<u64, DeltaStats>;

/// Walks the matrix in its current order and gathers delta statistics.
pub fn generate_stats(matrix: &SparseMatrix, min_limit: u64) -> StatsTable {
    let block_align = matrix.order.block_align();
    let mut stats = StatsTable::new();
    let mut xs: Vec<u64> = Vec::new();

    for i in 0..matrix.nr_transformed_rows() {
        for cell in matrix.row(i) {
            match cell {
                Cell::Plain { col, .. } => xs.push(*col),
                Cell::Patterned { .. } => update_stats(&mut xs, &mut stats, min_limit, block_align),
            }
        }
        update_stats(&mut xs, &mut stats, min_limit, block_align);
    }

    stats
}

/// Flushes the singleton-column buffer into the statistics table.
fn update_stats(xs: &mut Vec<u64>, stats: &mut StatsTable, min_limit: u64, block_align: Option<u64>) {
    if let Some(align) = block_align {
        update_stats_block(xs, stats, align);
        return;
    }
    if xs.is_empty() {
        return;
    }

    for record in rle::encode(&delta::encode(xs)) {
        if record.freq >= min_limit {
            let entry = stats.entry(record.val).or_default();
            entry.nnz += record.freq;
            entry.npatterns += 1;
        }
    }
    xs.clear();
}

/// Block-order flush: only delta-1 records are candidate block contents, and
/// an instance must start on an alignment boundary.
fn update_stats_block(xs: &mut Vec<u64>, stats: &mut StatsTable, align: u64) {
    if xs.is_empty() {
        return;
    }

    // `unit_start` is the 1-based absolute column of the first cell each
    // record produces.
    let mut unit_start = 0u64;
    for record in rle::encode(&delta::encode(xs)) {
        unit_start += record.val;
        if record.val == 1 {
            // The run joins with the element before it, so it spans freq + 1
            // cells starting at `unit_start - 1` (one-based).
            let mut nr_elem = record.freq + 1;
            let skip_front = if unit_start == 1 {
                0
            } else {
                (unit_start - 2) % align
            };
            nr_elem = nr_elem.saturating_sub(skip_front);
            let other_dim = nr_elem / align;
            if other_dim >= 2 {
                let entry = stats.entry(other_dim).or_default();
                entry.nnz += other_dim * align;
                entry.npatterns += 1;
            }
        }
        unit_start += record.val * (record.freq - 1);
    }
    xs.clear();
}

/// Renders a table the way the encoder logs it: one clause per delta.
pub fn summarize(stats: &StatsTable, total_nnz: u64) -> String {
    let mut out = String::new();
    for (delta, ds) in stats {
        let perc = 100.0 * ds.nnz as f64 / total_nnz as f64;
        out.push_str(&format!(
            " {}-> np:{} nnz: {:.1}% ({})",
            delta, ds.npatterns, perc, ds.nnz
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::IterationOrder;

    #[test]
    fn test_linear_stats_count_runs() {
        // Row 1: cols 3,5,7,9,11 -> deltas [3,2,2,2,2]: one delta-2 run of 4.
        let m = SparseMatrix::from_triplets(
            1,
            11,
            &[(1, 3, 1.0), (1, 5, 1.0), (1, 7, 1.0), (1, 9, 1.0), (1, 11, 1.0)],
        )
        .unwrap();
        let stats = generate_stats(&m, 4);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&2], DeltaStats { nnz: 4, npatterns: 1 });
    }

    #[test]
    fn test_linear_stats_respect_min_limit() {
        let m = SparseMatrix::from_triplets(1, 8, &[(1, 1, 1.0), (1, 2, 1.0), (1, 3, 1.0)]).unwrap();
        assert!(generate_stats(&m, 4).is_empty());
        assert!(!generate_stats(&m, 2).is_empty());
    }

    #[test]
    fn test_block_stats_require_two_aligned_groups() {
        // A full 2x2 block at rows 1-2, cols 1-2.
        let mut m = SparseMatrix::from_triplets(
            2,
            2,
            &[(1, 1, 1.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 1.0)],
        )
        .unwrap();
        m.transform(IterationOrder::BlockRow(2));
        let stats = generate_stats(&m, 4);
        assert_eq!(stats[&2], DeltaStats { nnz: 4, npatterns: 1 });
    }

    #[test]
    fn test_block_stats_skip_misaligned_prefix() {
        // Cols 2..=6 in block-row-2 space: the run starts off-boundary, so
        // one leading cell is discarded and two aligned groups remain.
        let mut m = SparseMatrix::from_triplets(
            2,
            3,
            &[(2, 1, 1.0), (1, 2, 1.0), (2, 2, 1.0), (1, 3, 1.0), (2, 3, 1.0)],
        )
        .unwrap();
        m.transform(IterationOrder::BlockRow(2));
        let stats = generate_stats(&m, 4);
        assert_eq!(stats[&2], DeltaStats { nnz: 4, npatterns: 1 });
    }

    #[test]
    fn test_patterned_cell_flushes_buffer() {
        use crate::matrix::PatternDescriptor;
        let mut m = SparseMatrix::from_triplets(
            1,
            10,
            &[
                (1, 1, 1.0),
                (1, 2, 1.0),
                (1, 5, 1.0),
                (1, 8, 1.0),
                (1, 9, 1.0),
                (1, 10, 1.0),
            ],
        )
        .unwrap();
        // Replace the middle of the row with a pattern anchor so the two
        // singleton groups are scored separately.
        let mut cells = m.row(0).to_vec();
        cells[2] = Cell::Patterned {
            col: 5,
            pattern: PatternDescriptor {
                order: IterationOrder::Vertical,
                delta: 1,
                size: 2,
            },
            vals: vec![1.0, 1.0],
        };
        m.replace_row(0, cells);
        let stats = generate_stats(&m, 2);
        // [1,2] and [8,9,10] each contribute one delta-1 run; the absolute
        // first column of the second flush (8) forms its own record.
        assert_eq!(stats[&1].npatterns, 2);
        assert_eq!(stats[&1].nnz, 4);
    }
}
