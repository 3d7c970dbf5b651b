//! Layer merger: one node table and one link table out of the three
//! layers, under global uniqueness and referential-integrity invariants.
//!
//! Link-id blocks end up in ascending ranges: meso connectors (local ids,
//! reserved by `link_shift_meso`), meso links, micro connectors, micro
//! links. Violations of the uniqueness invariants indicate an upstream
//! shift-computation bug and are fatal.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::model::{FinalNode, Layer, LinkTable, NodeTable, TazCentroid};
use crate::shift::ShiftPlan;

/// Leading columns of the merged link table; passthrough columns follow.
const LINK_BASE_COLUMNS: &[&str] = &["link_id", "from_node_id", "to_node_id", "link_type", "layer"];

/// The merged network, ready for export.
#[derive(Debug)]
pub struct MergedNetwork {
    /// Sorted by `node_id`, globally unique.
    pub nodes: Vec<FinalNode>,
    /// Unified link header: base columns, then passthrough columns in
    /// first-table-encountered order.
    pub link_columns: Vec<String>,
    /// Sorted by `(from_node_id, to_node_id)`, stringified for export.
    pub link_rows: Vec<Vec<String>>,
}

struct PendingLink {
    link_id: i64,
    from_node_id: i64,
    to_node_id: i64,
    values: Vec<String>,
}

fn check_unique(kind: &'static str, ids: impl Iterator<Item = i64>) -> Result<()> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for id in ids {
        if !seen.insert(id) && !duplicates.contains(&id) {
            duplicates.push(id);
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        duplicates.truncate(8);
        Err(Error::DuplicateIds { kind, sample: duplicates })
    }
}

/// Merge every layer into the final node and link tables.
///
/// Node tables must already be reindexed; link tables are consumed and
/// shifted here so no caller-owned table is mutated.
#[allow(clippy::too_many_arguments)]
pub fn merge_layers(
    mut meso_links: LinkTable,
    meso_connectors: LinkTable,
    mut micro_links: LinkTable,
    mut micro_connectors: LinkTable,
    meso_nodes: &NodeTable,
    micro_nodes: &NodeTable,
    tazs: &[TazCentroid],
    plan: &ShiftPlan,
) -> Result<MergedNetwork> {
    // Move original link ids and endpoints into their reserved ranges.
    for link in &mut meso_links.rows {
        link.from_node_id += plan.node_shift_meso;
        link.to_node_id += plan.node_shift_meso;
        link.link_id += plan.link_shift_meso;
    }
    for link in &mut micro_links.rows {
        link.from_node_id += plan.node_shift_micro;
        link.to_node_id += plan.node_shift_micro;
        if let Some(meso_link_id) = link.meso_link_id.as_mut() {
            *meso_link_id += plan.link_shift_meso;
        }
    }

    // Renumber the remaining blocks past the shifted meso links.
    let max_meso_link_id = meso_links.max_link_id();
    for link in &mut micro_connectors.rows {
        link.link_id += max_meso_link_id;
    }
    let micro_link_shift = if micro_connectors.rows.is_empty() {
        max_meso_link_id + 1
    } else {
        micro_connectors.max_link_id() + 1
    };
    for link in &mut micro_links.rows {
        link.link_id += micro_link_shift;
    }

    // Final node table: concatenate, project, sort.
    let mut nodes: Vec<FinalNode> = Vec::new();
    for taz in tazs {
        nodes.push(FinalNode {
            node_id: taz.id,
            x: taz.x,
            y: taz.y,
            zone_id: taz.id.to_string(),
            layer: Layer::Taz,
        });
    }
    for (table, layer) in [(meso_nodes, Layer::Meso), (micro_nodes, Layer::Micro)] {
        for node in &table.rows {
            nodes.push(FinalNode {
                node_id: node.node_id,
                x: node.x,
                y: node.y,
                zone_id: node.zone_id.clone(),
                layer,
            });
        }
    }
    nodes.sort_by_key(|n| n.node_id);
    check_unique("node", nodes.iter().map(|n| n.node_id))?;

    // Final link table: column union in concatenation order, then rows.
    let tables = [
        (&meso_connectors, Layer::Meso),
        (&meso_links, Layer::Meso),
        (&micro_connectors, Layer::Micro),
        (&micro_links, Layer::Micro),
    ];
    let mut columns: Vec<String> = LINK_BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    for (table, _) in &tables {
        if table.has_meso_link_id && !columns.iter().any(|c| c == "meso_link_id") {
            columns.push("meso_link_id".to_string());
        }
        for column in &table.extra_columns {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.clone());
            }
        }
    }

    let mut pending: Vec<PendingLink> = Vec::new();
    for (table, layer) in &tables {
        let extra_ix: HashMap<&str, usize> = table
            .extra_columns
            .iter()
            .enumerate()
            .map(|(ix, c)| (c.as_str(), ix))
            .collect();
        for link in &table.rows {
            let mut values = vec![
                link.link_id.to_string(),
                link.from_node_id.to_string(),
                link.to_node_id.to_string(),
                link.link_type.map(|t| t.to_string()).unwrap_or_default(),
                layer.as_str().to_string(),
            ];
            for column in &columns[LINK_BASE_COLUMNS.len()..] {
                let value = if column == "meso_link_id" && table.has_meso_link_id {
                    link.meso_link_id.map(|m| m.to_string()).unwrap_or_default()
                } else {
                    extra_ix
                        .get(column.as_str())
                        .map(|&ix| link.extras[ix].clone())
                        .unwrap_or_default()
                };
                values.push(value);
            }
            pending.push(PendingLink {
                link_id: link.link_id,
                from_node_id: link.from_node_id,
                to_node_id: link.to_node_id,
                values,
            });
        }
    }
    // Stable sort keeps concatenation order within equal endpoint pairs.
    pending.sort_by_key(|l| (l.from_node_id, l.to_node_id));
    check_unique("link", pending.iter().map(|l| l.link_id))?;

    // Every endpoint must resolve in the merged node table.
    let node_ids: HashSet<i64> = nodes.iter().map(|n| n.node_id).collect();
    for link in &pending {
        for node_id in [link.from_node_id, link.to_node_id] {
            if !node_ids.contains(&node_id) {
                return Err(Error::DanglingEndpoint { link_id: link.link_id, node_id });
            }
        }
    }

    Ok(MergedNetwork {
        nodes,
        link_columns: columns,
        link_rows: pending.into_iter().map(|l| l.values).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{generate_meso_connectors, generate_micro_connectors};
    use crate::model::{NetworkLink, NetworkNode, TazMicroAccess};

    fn node(id: i64, x: f64, y: f64) -> NetworkNode {
        NetworkNode {
            node_id: id,
            x,
            y,
            scc_id: 0,
            meso_link_id: None,
            zone_id: String::new(),
            extras: Vec::new(),
        }
    }

    fn link(link_id: i64, from: i64, to: i64, meso_link_id: Option<i64>) -> NetworkLink {
        NetworkLink {
            link_id,
            from_node_id: from,
            to_node_id: to,
            link_type: None,
            meso_link_id,
            extras: Vec::new(),
        }
    }

    fn node_table(rows: Vec<NetworkNode>) -> NodeTable {
        NodeTable { extra_columns: Vec::new(), rows }
    }

    fn link_table(rows: Vec<NetworkLink>, micro: bool) -> LinkTable {
        LinkTable {
            extra_columns: Vec::new(),
            has_meso_link_id: micro,
            rows,
        }
    }

    /// One TAZ, a 3-node meso cycle, a two-hop micro chain under the meso
    /// link out of the access node. Mirrors the smallest realistic input.
    fn merged_fixture() -> (MergedNetwork, ShiftPlan) {
        let tazs = vec![TazCentroid { id: 101, x: 0.0, y: 0.0, candidates: vec![1] }];
        let mut meso_nodes = node_table(vec![
            node(1, 1.0, 0.0),
            node(2, 2.0, 0.0),
            node(3, 2.0, 1.0),
            node(4, 5.0, 5.0),
        ]);
        let mut micro_nodes = node_table(vec![
            NetworkNode { meso_link_id: Some(1), ..node(21, 1.1, 0.0) },
            NetworkNode { meso_link_id: Some(1), ..node(22, 1.5, 0.0) },
            NetworkNode { meso_link_id: Some(1), ..node(23, 1.9, 0.0) },
        ]);
        let meso_links = link_table(
            vec![link(1, 1, 2, None), link(2, 2, 3, None), link(3, 3, 1, None)],
            false,
        );
        let micro_links = link_table(
            vec![link(11, 21, 22, Some(1)), link(12, 22, 23, Some(1))],
            true,
        );

        let plan = ShiftPlan::compute(&tazs, &meso_nodes, &micro_nodes);
        plan.apply_to_nodes(&mut meso_nodes, &mut micro_nodes);
        let meso_connectors = generate_meso_connectors(&tazs, &meso_nodes, &plan).unwrap();
        let micro_map = vec![TazMicroAccess { taz_id: 101, micro_node_id: 21, x: 1.1, y: 0.0 }];
        let micro_connectors = generate_micro_connectors(&tazs, &micro_map, &plan).unwrap();

        let merged = merge_layers(
            meso_links,
            meso_connectors,
            micro_links,
            micro_connectors,
            &meso_nodes,
            &micro_nodes,
            &tazs,
            &plan,
        )
        .unwrap();
        (merged, plan)
    }

    #[test]
    fn test_node_table_sorted_and_unique() {
        let (merged, _) = merged_fixture();
        let ids: Vec<i64> = merged.nodes.iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![101, 103, 104, 105, 106, 127, 128, 129]);
        assert_eq!(merged.nodes[0].layer, Layer::Taz);
        assert_eq!(merged.nodes[0].zone_id, "101");
        assert!(merged.nodes[1..].iter().all(|n| n.zone_id.is_empty()));
    }

    #[test]
    fn test_link_id_blocks_ascend_by_layer() {
        let (merged, _) = merged_fixture();
        let ids: Vec<i64> = merged
            .link_rows
            .iter()
            .map(|row| row[0].parse().unwrap())
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len(), "link ids must be unique");

        // Meso connectors 1-2, meso links 4-6, micro connectors 7-8,
        // micro links 20-21.
        let expected: HashSet<i64> = [1, 2, 4, 5, 6, 7, 8, 20, 21].into();
        assert_eq!(ids.into_iter().collect::<HashSet<i64>>(), expected);
    }

    #[test]
    fn test_links_sorted_by_endpoint_pair() {
        let (merged, _) = merged_fixture();
        let keys: Vec<(i64, i64)> = merged
            .link_rows
            .iter()
            .map(|row| (row[1].parse().unwrap(), row[2].parse().unwrap()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_every_endpoint_resolves() {
        let (merged, _) = merged_fixture();
        let node_ids: HashSet<i64> = merged.nodes.iter().map(|n| n.node_id).collect();
        for row in &merged.link_rows {
            assert!(node_ids.contains(&row[1].parse().unwrap()));
            assert!(node_ids.contains(&row[2].parse().unwrap()));
        }
    }

    #[test]
    fn test_micro_back_reference_follows_meso_link_shift() {
        let (merged, plan) = merged_fixture();
        let meso_link_ix = merged
            .link_columns
            .iter()
            .position(|c| c == "meso_link_id")
            .unwrap();
        // Micro links subdivided meso link 1, which became 1 + link shift.
        let expected = (1 + plan.link_shift_meso).to_string();
        let micro_rows: Vec<&Vec<String>> = merged
            .link_rows
            .iter()
            .filter(|row| !row[meso_link_ix].is_empty())
            .collect();
        assert_eq!(micro_rows.len(), 2);
        for row in micro_rows {
            assert_eq!(row[meso_link_ix], expected);
        }
    }

    #[test]
    fn test_column_order_starts_with_base_columns() {
        let (merged, _) = merged_fixture();
        assert_eq!(
            &merged.link_columns[..5],
            &["link_id", "from_node_id", "to_node_id", "link_type", "layer"]
        );
        assert!(merged.link_columns.iter().any(|c| c == "geometry"));
    }

    #[test]
    fn test_duplicate_link_ids_are_fatal() {
        let tazs = vec![TazCentroid { id: 10, x: 0.0, y: 0.0, candidates: vec![1] }];
        let mut meso_nodes = node_table(vec![node(1, 1.0, 0.0), node(2, 2.0, 0.0)]);
        let mut micro_nodes = node_table(Vec::new());
        // Two meso links sharing an id survive shifting as a collision.
        let meso_links = link_table(vec![link(1, 1, 2, None), link(1, 2, 1, None)], false);

        let plan = ShiftPlan::compute(&tazs, &meso_nodes, &micro_nodes);
        plan.apply_to_nodes(&mut meso_nodes, &mut micro_nodes);
        let meso_connectors = generate_meso_connectors(&tazs, &meso_nodes, &plan).unwrap();

        let err = merge_layers(
            meso_links,
            meso_connectors,
            link_table(Vec::new(), true),
            link_table(Vec::new(), false),
            &meso_nodes,
            &micro_nodes,
            &tazs,
            &plan,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateIds { kind: "link", .. }));
    }

    #[test]
    fn test_dangling_endpoint_is_fatal() {
        let tazs = vec![TazCentroid { id: 10, x: 0.0, y: 0.0, candidates: vec![1] }];
        let mut meso_nodes = node_table(vec![node(1, 1.0, 0.0)]);
        let mut micro_nodes = node_table(Vec::new());
        // Meso link to node 9, which has no node row.
        let meso_links = link_table(vec![link(1, 1, 9, None)], false);

        let plan = ShiftPlan::compute(&tazs, &meso_nodes, &micro_nodes);
        plan.apply_to_nodes(&mut meso_nodes, &mut micro_nodes);
        let meso_connectors = generate_meso_connectors(&tazs, &meso_nodes, &plan).unwrap();

        let err = merge_layers(
            meso_links,
            meso_connectors,
            link_table(Vec::new(), true),
            link_table(Vec::new(), false),
            &meso_nodes,
            &micro_nodes,
            &tazs,
            &plan,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DanglingEndpoint { .. }));
    }
}
