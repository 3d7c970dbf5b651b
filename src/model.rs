//! Record types for the three network layers.
//!
//! Node and link tables keep their typed pipeline columns alongside the
//! passthrough columns of the source CSV, so exports can reproduce input
//! attributes the pipeline never touches. Passthrough values live in a
//! per-row `extras` vector parallel to the table's `extra_columns` header.

use serde::Serialize;
use std::collections::HashMap;

/// Source layer of a node or link row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Meso,
    Micro,
    Taz,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Meso => "meso",
            Layer::Micro => "micro",
            Layer::Taz => "taz",
        }
    }
}

/// A node row from a meso or micro node table.
#[derive(Debug, Clone)]
pub struct NetworkNode {
    pub node_id: i64,
    pub x: f64,
    pub y: f64,
    /// Component rank assigned by the SCC classifier; -1 until classified
    /// (and permanently -1 for nodes absent from every link).
    pub scc_id: i64,
    /// Back-reference into the meso link table (micro nodes only).
    pub meso_link_id: Option<i64>,
    pub zone_id: String,
    /// Passthrough values, parallel to `NodeTable::extra_columns`.
    pub extras: Vec<String>,
}

/// A node table with its passthrough column names.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    pub extra_columns: Vec<String>,
    pub rows: Vec<NetworkNode>,
}

impl NodeTable {
    pub fn max_node_id(&self) -> i64 {
        self.rows.iter().map(|n| n.node_id).max().unwrap_or(0)
    }

    /// Coordinate lookup keyed by node id.
    pub fn coordinates_by_id(&self) -> HashMap<i64, (f64, f64)> {
        self.rows.iter().map(|n| (n.node_id, (n.x, n.y))).collect()
    }
}

/// A link row from a meso, micro, or connector link table.
#[derive(Debug, Clone)]
pub struct NetworkLink {
    pub link_id: i64,
    pub from_node_id: i64,
    pub to_node_id: i64,
    pub link_type: Option<i64>,
    /// Foreign key into the meso link table (micro links only).
    pub meso_link_id: Option<i64>,
    /// Passthrough values, parallel to `LinkTable::extra_columns`.
    pub extras: Vec<String>,
}

/// A link table with its passthrough column names.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    pub extra_columns: Vec<String>,
    /// Whether this table carries the `meso_link_id` column.
    pub has_meso_link_id: bool,
    pub rows: Vec<NetworkLink>,
}

impl LinkTable {
    pub fn max_link_id(&self) -> i64 {
        self.rows.iter().map(|l| l.link_id).max().unwrap_or(0)
    }
}

/// A TAZ demand centroid. `id` doubles as the eventual TAZ node id.
#[derive(Debug, Clone)]
pub struct TazCentroid {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    /// Ranked nearest routable-core node ids (pre-shift), best first.
    pub candidates: Vec<i64>,
}

/// One (TAZ, micro entry node) pairing from the downstream micro locator.
#[derive(Debug, Clone, PartialEq)]
pub struct TazMicroAccess {
    pub taz_id: i64,
    pub micro_node_id: i64,
    pub x: f64,
    pub y: f64,
}

/// A row of the merged node table.
#[derive(Debug, Clone, Serialize)]
pub struct FinalNode {
    pub node_id: i64,
    pub x: f64,
    pub y: f64,
    pub zone_id: String,
    pub layer: Layer,
}
