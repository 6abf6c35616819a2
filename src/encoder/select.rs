//! Admission filtering and traversal-order selection.
//!
//! Each gathered statistics table is pruned down to its admitted deltas,
//! then every order is scored: a covered non-zero is a win, a pattern
//! instance costs a descriptor. The order with the strictly greatest
//! positive score is applied; when nothing scores positive there is no
//! encoding worth doing.

use std::collections::{BTreeMap, BTreeSet};

use crate::encoder::stats::StatsTable;
use crate::matrix::{IterationOrder, ENUMERATION};

/// Prunes deltas whose coverage fraction is below `min_perc` and returns
/// the surviving (admitted) delta set.
pub fn filter_stats(stats: &mut StatsTable, total_nnz: u64, min_perc: f64) -> BTreeSet<u64> {
    stats.retain(|_, ds| (ds.nnz as f64 / total_nnz as f64) >= min_perc);
    stats.keys().copied().collect()
}

/// Score of one order's admitted statistics.
pub fn type_score(stats: &StatsTable) -> u64 {
    stats.values().map(|ds| ds.nnz - ds.npatterns).sum()
}

/// Picks the order with the strictly greatest positive score; ties keep the
/// earliest order in the fixed enumeration. `None` means no encoding.
pub fn choose_order(all: &BTreeMap<IterationOrder, StatsTable>) -> Option<IterationOrder> {
    let mut best = None;
    let mut max_score = 0u64;
    for order in ENUMERATION {
        let Some(stats) = all.get(&order) else {
            continue;
        };
        let score = type_score(stats);
        if score > max_score {
            max_score = score;
            best = Some(order);
        }
    }
    best
}
