//! Downstream micro locator: where traffic leaving a meso node first enters
//! the fine-grained network.
//!
//! The micro subdivision of a meso corridor is assumed to be a simple
//! directed chain or small DAG, so its entry points are exactly the nodes
//! that appear as a `from_node_id` but never as a `to_node_id` within the
//! subdivision. This is set arithmetic, not a path search.

use std::collections::HashSet;

use crate::model::{LinkTable, NodeTable, TazCentroid, TazMicroAccess};

/// Entry node ids of the micro subdivision of every meso link outgoing from
/// `meso_node_id`. Sorted ascending for deterministic downstream iteration.
///
/// Returns an empty list when the meso node has no outgoing links or none of
/// them are subdivided into micro links.
pub fn downstream_entry_nodes(
    meso_node_id: i64,
    meso_links: &LinkTable,
    micro_links: &LinkTable,
) -> Vec<i64> {
    let outgoing: HashSet<i64> = meso_links
        .rows
        .iter()
        .filter(|l| l.from_node_id == meso_node_id)
        .map(|l| l.link_id)
        .collect();

    let mut from_nodes = HashSet::new();
    let mut to_nodes = HashSet::new();
    for link in &micro_links.rows {
        let Some(meso_link_id) = link.meso_link_id else {
            continue;
        };
        if outgoing.contains(&meso_link_id) {
            from_nodes.insert(link.from_node_id);
            to_nodes.insert(link.to_node_id);
        }
    }

    let mut entries: Vec<i64> = from_nodes.difference(&to_nodes).copied().collect();
    entries.sort_unstable();
    entries
}

/// Pair each TAZ with the micro entry nodes downstream of its rank-1 meso
/// candidate, joined back to micro node coordinates.
///
/// TAZs without a candidate or without entry nodes contribute no rows.
pub fn map_taz_to_micro_nodes(
    tazs: &[TazCentroid],
    meso_links: &LinkTable,
    micro_links: &LinkTable,
    micro_nodes: &NodeTable,
) -> Vec<TazMicroAccess> {
    let mut rows = Vec::new();
    for taz in tazs {
        let Some(&meso_node_id) = taz.candidates.first() else {
            continue;
        };
        let entries: HashSet<i64> = downstream_entry_nodes(meso_node_id, meso_links, micro_links)
            .into_iter()
            .collect();
        // Join in micro node table order to keep output order input-driven.
        for node in micro_nodes.rows.iter().filter(|n| entries.contains(&n.node_id)) {
            rows.push(TazMicroAccess {
                taz_id: taz.id,
                micro_node_id: node.node_id,
                x: node.x,
                y: node.y,
            });
        }
    }
    rows
}
