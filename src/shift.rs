//! Id-space reindexing.
//!
//! A `ShiftPlan` captures the additive offsets that keep the TAZ, meso, and
//! micro id spaces disjoint after the merge. Offsets are computed once from
//! pre-shift maxima and threaded through the pipeline as a value, never as
//! shared mutable state. `verify_node_ranges` is the post-condition guard:
//! it fails both when a shift was skipped and when one was applied twice.

use crate::error::{Error, Result};
use crate::model::{NodeTable, TazCentroid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPlan {
    /// Added to every meso node id: `max(TAZ id) + 1`.
    pub node_shift_meso: i64,
    /// Added to every micro node id: `node_shift_meso + max(meso node id)`.
    pub node_shift_micro: i64,
    /// Added to meso link ids, reserving `[1, 2 * |TAZ|]` for the meso
    /// connectors' locally-numbered links.
    pub link_shift_meso: i64,
    max_taz_id: i64,
    max_meso_node_id: i64,
    max_micro_node_id: i64,
}

impl ShiftPlan {
    /// Compute offsets from pre-shift maxima. Must be called before any
    /// table is reindexed.
    pub fn compute(
        tazs: &[TazCentroid],
        meso_nodes: &NodeTable,
        micro_nodes: &NodeTable,
    ) -> Self {
        let max_taz_id = tazs.iter().map(|t| t.id).max().unwrap_or(0);
        let max_meso_node_id = meso_nodes.max_node_id();
        let max_micro_node_id = micro_nodes.max_node_id();
        let node_shift_meso = max_taz_id + 1;
        ShiftPlan {
            node_shift_meso,
            node_shift_micro: node_shift_meso + max_meso_node_id,
            link_shift_meso: 2 * tazs.len() as i64 + 1,
            max_taz_id,
            max_meso_node_id,
            max_micro_node_id,
        }
    }

    /// Reindex both node tables in place: meso and micro node ids move into
    /// their reserved ranges, micro back-references follow the later meso
    /// link shift, and `zone_id` is cleared on all non-TAZ nodes.
    ///
    /// Must be applied exactly once; `verify_node_ranges` enforces this.
    pub fn apply_to_nodes(&self, meso_nodes: &mut NodeTable, micro_nodes: &mut NodeTable) {
        for node in &mut meso_nodes.rows {
            node.node_id += self.node_shift_meso;
            node.zone_id.clear();
        }
        for node in &mut micro_nodes.rows {
            node.node_id += self.node_shift_micro;
            if let Some(meso_link_id) = node.meso_link_id.as_mut() {
                *meso_link_id += self.link_shift_meso;
            }
            node.zone_id.clear();
        }
    }

    /// Post-condition: shifted node ids sit exactly where the plan reserved
    /// them. Detects skipped and double-applied shifts alike.
    pub fn verify_node_ranges(&self, meso_nodes: &NodeTable, micro_nodes: &NodeTable) -> Result<()> {
        if !meso_nodes.rows.is_empty() {
            let max = meso_nodes.max_node_id();
            let min = meso_nodes.rows.iter().map(|n| n.node_id).min().unwrap_or(0);
            if max != self.max_meso_node_id + self.node_shift_meso {
                return Err(Error::ShiftViolation(format!(
                    "max meso node id {} != pre-shift max {} + offset {}",
                    max, self.max_meso_node_id, self.node_shift_meso
                )));
            }
            if min <= self.max_taz_id {
                return Err(Error::ShiftViolation(format!(
                    "meso node id {} collides with TAZ id space (max TAZ id {})",
                    min, self.max_taz_id
                )));
            }
        }
        if !micro_nodes.rows.is_empty() {
            let max = micro_nodes.max_node_id();
            let min = micro_nodes.rows.iter().map(|n| n.node_id).min().unwrap_or(0);
            if max != self.max_micro_node_id + self.node_shift_micro {
                return Err(Error::ShiftViolation(format!(
                    "max micro node id {} != pre-shift max {} + offset {}",
                    max, self.max_micro_node_id, self.node_shift_micro
                )));
            }
            if min <= self.node_shift_micro {
                return Err(Error::ShiftViolation(format!(
                    "micro node id {} collides with the shifted meso range (ends at {})",
                    min, self.node_shift_micro
                )));
            }
        }
        Ok(())
    }
}
