//! Connector synthesis: bidirectional access links joining each TAZ to the
//! network.
//!
//! Meso connectors target the TAZ's rank-1 candidate in the routable core;
//! micro connectors target the downstream entry nodes of that candidate.
//! Both emit a forward and a reverse link sharing reversed geometry, with
//! placeholder attributes, numbered locally from 1. The merger renumbers
//! them into the global link-id sequence.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::model::{LinkTable, NetworkLink, NodeTable, TazCentroid, TazMicroAccess};
use crate::shift::ShiftPlan;

/// Attribute columns carried by every connector link.
pub const CONNECTOR_ATTR_COLUMNS: &[&str] = &[
    "dir_flag",
    "length",
    "lanes",
    "free_speed",
    "capacity",
    "link_type_name",
    "geometry",
    "allowed_uses",
    "from_biway",
    "is_link",
];

fn connector_link(
    link_id: i64,
    from_node_id: i64,
    to_node_id: i64,
    from_xy: (f64, f64),
    to_xy: (f64, f64),
) -> NetworkLink {
    NetworkLink {
        link_id,
        from_node_id,
        to_node_id,
        link_type: Some(0),
        meso_link_id: None,
        extras: vec![
            "1".to_string(),
            "100".to_string(),
            "1".to_string(),
            "120".to_string(),
            "100000".to_string(),
            "connector".to_string(),
            format!(
                "LINESTRING ({} {}, {} {})",
                from_xy.0, from_xy.1, to_xy.0, to_xy.1
            ),
            "auto".to_string(),
            "1".to_string(),
            "0".to_string(),
        ],
    }
}

fn connector_table(rows: Vec<NetworkLink>) -> LinkTable {
    LinkTable {
        extra_columns: CONNECTOR_ATTR_COLUMNS.iter().map(|c| c.to_string()).collect(),
        has_meso_link_id: false,
        rows,
    }
}

/// Forward/reverse connector pairs between each TAZ and its rank-1 meso
/// candidate. `meso_nodes` must already be reindexed.
pub fn generate_meso_connectors(
    tazs: &[TazCentroid],
    meso_nodes: &NodeTable,
    plan: &ShiftPlan,
) -> Result<LinkTable> {
    let coords = meso_nodes.coordinates_by_id();
    let mut rows = Vec::with_capacity(tazs.len() * 2);
    let mut link_id = 1;

    for taz in tazs {
        let candidate = *taz
            .candidates
            .first()
            .ok_or(Error::NoCandidate { taz_id: taz.id })?;
        let target = candidate + plan.node_shift_meso;
        let &(node_x, node_y) = coords
            .get(&target)
            .ok_or(Error::UnknownNode { node_id: target })?;

        rows.push(connector_link(link_id, taz.id, target, (taz.x, taz.y), (node_x, node_y)));
        rows.push(connector_link(link_id + 1, target, taz.id, (node_x, node_y), (taz.x, taz.y)));
        link_id += 2;
    }
    Ok(connector_table(rows))
}

/// Forward/reverse connector pairs between TAZs and their micro entry
/// nodes. Applies the micro node shift to the map's pre-shift ids; a micro
/// node already claimed by an earlier TAZ is skipped (first claim wins).
pub fn generate_micro_connectors(
    tazs: &[TazCentroid],
    micro_map: &[TazMicroAccess],
    plan: &ShiftPlan,
) -> Result<LinkTable> {
    let taz_coords: HashMap<i64, (f64, f64)> = tazs.iter().map(|t| (t.id, (t.x, t.y))).collect();
    let mut claimed: HashSet<i64> = HashSet::new();
    let mut rows = Vec::new();
    let mut link_id = 1;

    for access in micro_map {
        let target = access.micro_node_id + plan.node_shift_micro;
        if !claimed.insert(target) {
            continue;
        }
        let &(taz_x, taz_y) = taz_coords
            .get(&access.taz_id)
            .ok_or(Error::UnknownTaz { taz_id: access.taz_id })?;

        rows.push(connector_link(link_id, access.taz_id, target, (taz_x, taz_y), (access.x, access.y)));
        rows.push(connector_link(link_id + 1, target, access.taz_id, (access.x, access.y), (taz_x, taz_y)));
        link_id += 2;
    }
    Ok(connector_table(rows))
}
