//! The delta-RLE encoder: statistics gathering, order selection, and row
//! re-encoding, orchestrated into single or chained passes.
//!
//! One pass is `stats -> select -> transform -> re-encode -> transform back`;
//! `encode_all` repeats passes until no order scores positive. Each applied
//! order is added to the ignore set, so a full run terminates in at most one
//! pass per order. The encoder owns the matrix mutably for the duration.

pub mod select;
pub mod stats;

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::EncoderConfig;
use crate::error::CsxError;
use crate::kernels::{delta, rle};
use crate::matrix::{Cell, IterationOrder, PatternDescriptor, SparseMatrix, ENUMERATION};
use crate::encoder::stats::StatsTable;

/// Drives pattern detection and replacement over one matrix.
pub struct DrleEncoder<'a> {
    matrix: &'a mut SparseMatrix,
    config: EncoderConfig,
    ignore: BTreeSet<IterationOrder>,
    stats: BTreeMap<IterationOrder, StatsTable>,
    deltas_to_encode: BTreeMap<IterationOrder, BTreeSet<u64>>,
}

impl<'a> DrleEncoder<'a> {
    pub fn new(matrix: &'a mut SparseMatrix, config: EncoderConfig) -> Self {
        DrleEncoder {
            matrix,
            config,
            ignore: BTreeSet::new(),
            stats: BTreeMap::new(),
            deltas_to_encode: BTreeMap::new(),
        }
    }

    pub fn add_ignore(&mut self, order: IterationOrder) {
        self.ignore.insert(order);
    }

    pub fn remove_ignore(&mut self, order: IterationOrder) {
        self.ignore.remove(&order);
    }

    pub fn ignore_all(&mut self) {
        self.ignore.extend(ENUMERATION);
    }

    pub fn remove_all_ignores(&mut self) {
        self.ignore.clear();
    }

    /// Gathers and filters statistics for every non-ignored order.
    pub fn gen_all_stats(&mut self) {
        self.stats.clear();
        self.deltas_to_encode.clear();
        let total_nnz = self.matrix.nr_nonzeros;

        for order in ENUMERATION {
            if self.ignore.contains(&order) {
                continue;
            }
            self.matrix.transform(order);
            let mut table = stats::generate_stats(self.matrix, self.config.min_limit);
            self.matrix.transform(IterationOrder::Horizontal);

            let admitted = select::filter_stats(&mut table, total_nnz, self.config.min_perc);
            if !table.is_empty() {
                debug!("{}:{}", order, stats::summarize(&table, total_nnz));
            }
            self.deltas_to_encode.insert(order, admitted);
            self.stats.insert(order, table);
        }
    }

    /// The order the gathered statistics point at, if any scores positive.
    pub fn choose_order(&self) -> Option<IterationOrder> {
        select::choose_order(&self.stats)
    }

    /// Runs one encoding pass for `order`, replacing admitted runs with
    /// pattern descriptors. The matrix comes back in horizontal order and
    /// `order` joins the ignore set.
    pub fn encode(&mut self, order: IterationOrder) -> Result<(), CsxError> {
        debug!("encode to {}", order);
        self.matrix.transform(order);

        let mut newrow: Vec<Cell> = Vec::new();
        let mut xs: Vec<u64> = Vec::new();
        let mut vs: Vec<f64> = Vec::new();
        for i in 0..self.matrix.nr_transformed_rows() {
            let cells = self.matrix.take_row(i);
            self.encode_row(order, cells, &mut newrow, &mut xs, &mut vs)?;
            self.matrix.replace_row(i, std::mem::take(&mut newrow));
        }

        self.matrix.transform(IterationOrder::Horizontal);
        self.add_ignore(order);
        Ok(())
    }

    /// Expands patterns of `order` back into plain cells; the exact inverse
    /// of an [`encode`](Self::encode) pass for that order.
    pub fn decode(&mut self, order: IterationOrder) {
        self.matrix.transform(order);

        for i in 0..self.matrix.nr_transformed_rows() {
            let cells = self.matrix.take_row(i);
            let mut newrow = Vec::with_capacity(cells.len());
            for cell in cells {
                match cell {
                    Cell::Patterned { col, pattern, vals } if pattern.order == order => {
                        // In its own order's space the pattern is a plain
                        // strided run along the row.
                        let stride = if pattern.order.block_align().is_some() {
                            1
                        } else {
                            pattern.delta
                        };
                        for (j, val) in vals.into_iter().enumerate() {
                            newrow.push(Cell::Plain {
                                col: col + j as u64 * stride,
                                val,
                            });
                        }
                    }
                    other => newrow.push(other),
                }
            }
            self.matrix.replace_row(i, newrow);
        }

        self.matrix.transform(IterationOrder::Horizontal);
    }

    /// Repeats stats/select/encode passes until no order scores positive.
    pub fn encode_all(&mut self) -> Result<(), CsxError> {
        loop {
            self.gen_all_stats();
            let Some(order) = self.choose_order() else {
                break;
            };
            self.encode(order)?;
        }
        Ok(())
    }

    /// Re-encodes one row: singleton stretches gather into scratch buffers
    /// and flush through the pattern matcher; existing pattern anchors pass
    /// through untouched.
    fn encode_row(
        &self,
        order: IterationOrder,
        cells: Vec<Cell>,
        newrow: &mut Vec<Cell>,
        xs: &mut Vec<u64>,
        vs: &mut Vec<f64>,
    ) -> Result<(), CsxError> {
        for cell in cells {
            match cell {
                Cell::Plain { col, val } => {
                    xs.push(col);
                    vs.push(val);
                }
                patterned => {
                    if !xs.is_empty() {
                        self.do_encode(order, xs, vs, newrow)?;
                    }
                    newrow.push(patterned);
                }
            }
        }
        if !xs.is_empty() {
            self.do_encode(order, xs, vs, newrow)?;
        }
        Ok(())
    }

    /// Encodes one stretch of singletons, emitting pattern descriptors for
    /// admitted runs and plain cells for the rest.
    fn do_encode(
        &self,
        order: IterationOrder,
        xs: &mut Vec<u64>,
        vs: &mut Vec<f64>,
        newrow: &mut Vec<Cell>,
    ) -> Result<(), CsxError> {
        if let Some(align) = order.block_align() {
            return self.do_encode_block(order, align, xs, vs, newrow);
        }

        let empty = BTreeSet::new();
        let deltas_set = self.deltas_to_encode.get(&order).unwrap_or(&empty);
        let records = rle::encode(&delta::encode(xs));

        let mut col: u64 = 0;
        let mut vi = 0usize;
        for record in records {
            let mut freq = record.freq;
            if deltas_set.contains(&record.val) {
                while freq >= self.config.min_limit {
                    let chunk = freq.min(self.config.max_limit);
                    col += record.val;
                    newrow.push(Cell::Patterned {
                        col,
                        pattern: PatternDescriptor {
                            order,
                            delta: record.val,
                            size: chunk,
                        },
                        vals: vs[vi..vi + chunk as usize].to_vec(),
                    });
                    vi += chunk as usize;
                    col += record.val * (chunk - 1);
                    freq -= chunk;
                }
            }

            for _ in 0..freq {
                col += record.val;
                newrow.push(Cell::Plain { col, val: vs[vi] });
                vi += 1;
            }
        }

        debug_assert_eq!(vi, vs.len());
        if vi != vs.len() {
            return Err(CsxError::Internal(format!(
                "value cursor at {} of {} after row stretch",
                vi,
                vs.len()
            )));
        }
        xs.clear();
        vs.clear();
        Ok(())
    }

    /// Block-order variant: a qualifying delta-1 run is carved into aligned
    /// block descriptors, annexing the singleton that actually started the
    /// run and re-emitting the misaligned fringe as singletons.
    fn do_encode_block(
        &self,
        order: IterationOrder,
        align: u64,
        xs: &mut Vec<u64>,
        vs: &mut Vec<f64>,
        newrow: &mut Vec<Cell>,
    ) -> Result<(), CsxError> {
        let empty = BTreeSet::new();
        let deltas_set = self.deltas_to_encode.get(&order).unwrap_or(&empty);
        let records = rle::encode(&delta::encode(xs));

        // Descriptor capacity rounded down to whole block pairs.
        let aligned_max = (self.config.max_limit / (2 * align)) * (2 * align);

        let mut col: u64 = 0;
        let mut vi = 0usize;
        for record in records {
            col += record.val;

            let (skip_front, mut nr_elem) = if col == 1 {
                (0, record.freq)
            } else {
                let misalign = (col - 2) % align;
                let skip = if misalign != 0 { align - misalign } else { 0 };
                (skip, record.freq + 1)
            };
            nr_elem = nr_elem.saturating_sub(skip_front);
            let mut skip_back = nr_elem % align;
            nr_elem -= skip_back;

            let qualifies = record.val == 1
                && aligned_max > 0
                && nr_elem >= 2 * align
                && deltas_set.contains(&(nr_elem / align));

            if qualifies {
                let rle_start = if col != 1 {
                    // The immediately-prior singleton is the true first cell
                    // of this run: reclaim it and its value.
                    let popped = newrow.pop();
                    debug_assert!(
                        matches!(popped, Some(Cell::Plain { .. })),
                        "block annexed a non-singleton cell"
                    );
                    debug_assert!(vi > 0);
                    vi -= 1;
                    col - 1
                } else {
                    col
                };

                for i in 0..skip_front {
                    newrow.push(Cell::Plain {
                        col: rle_start + i,
                        val: vs[vi],
                    });
                    vi += 1;
                }

                let mut nr_blocks = nr_elem / aligned_max;
                let nr_elem_block = aligned_max.min(nr_elem);
                if nr_blocks == 0 {
                    nr_blocks = 1;
                } else {
                    // Leftover cells from capacity alignment join the tail.
                    skip_back += nr_elem - nr_elem_block * nr_blocks;
                }

                for i in 0..nr_blocks {
                    let anchor = rle_start + skip_front + i * nr_elem_block;
                    newrow.push(Cell::Patterned {
                        col: anchor,
                        pattern: PatternDescriptor {
                            order,
                            delta: nr_elem_block / align,
                            size: nr_elem_block,
                        },
                        vals: vs[vi..vi + nr_elem_block as usize].to_vec(),
                    });
                    vi += nr_elem_block as usize;
                }

                for i in 0..skip_back {
                    newrow.push(Cell::Plain {
                        col: rle_start + skip_front + nr_elem_block * nr_blocks + i,
                        val: vs[vi],
                    });
                    vi += 1;
                }
            } else {
                for i in 0..record.freq {
                    newrow.push(Cell::Plain {
                        col: col + i * record.val,
                        val: vs[vi],
                    });
                    vi += 1;
                }
            }

            col += record.val * (record.freq - 1);
        }

        debug_assert_eq!(vi, vs.len());
        if vi != vs.len() {
            return Err(CsxError::Internal(format!(
                "value cursor at {} of {} after block stretch",
                vi,
                vs.len()
            )));
        }
        xs.clear();
        vs.clear();
        Ok(())
    }
}
