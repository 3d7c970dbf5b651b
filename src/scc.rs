//! Strongly-connected-component classification of the meso network.
//!
//! Components are ranked by descending node count and assigned consecutive
//! ids starting at 0, so id 0 always denotes the routable core. Equal-size
//! components are ordered by their smallest member node id, which keeps the
//! ranking independent of input row order.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{Graph, NodeIndex};

use crate::model::{LinkTable, NodeTable};

fn intern(graph: &mut Graph<i64, ()>, node_map: &mut HashMap<i64, NodeIndex>, id: i64) -> NodeIndex {
    if let Some(&ix) = node_map.get(&id) {
        return ix;
    }
    let ix = graph.add_node(id);
    node_map.insert(id, ix);
    ix
}

/// Compute the `node_id -> scc_id` mapping from a directed link table.
///
/// Self-loops and parallel edges are treated as ordinary edges. Nodes absent
/// from every link are absent from the mapping; the caller assigns them -1.
/// A zero-edge table yields an empty mapping, not an error.
pub fn compute_scc_ids(links: &LinkTable) -> HashMap<i64, i64> {
    let mut graph: Graph<i64, ()> = Graph::new();
    let mut node_map: HashMap<i64, NodeIndex> = HashMap::new();

    for link in &links.rows {
        let from = intern(&mut graph, &mut node_map, link.from_node_id);
        let to = intern(&mut graph, &mut node_map, link.to_node_id);
        graph.add_edge(from, to, ());
    }

    let mut components: Vec<Vec<i64>> = tarjan_scc(&graph)
        .into_iter()
        .map(|component| component.into_iter().map(|ix| graph[ix]).collect())
        .collect();
    components.sort_by_key(|component: &Vec<i64>| {
        let min_id = component.iter().copied().min().unwrap_or(i64::MAX);
        (std::cmp::Reverse(component.len()), min_id)
    });

    components
        .into_iter()
        .enumerate()
        .flat_map(|(scc_id, component)| {
            component.into_iter().map(move |node_id| (node_id, scc_id as i64))
        })
        .collect()
}

/// Write `scc_id` onto every node row; nodes outside the mapping get -1.
pub fn annotate_nodes(nodes: &mut NodeTable, scc_ids: &HashMap<i64, i64>) {
    for node in &mut nodes.rows {
        node.scc_id = scc_ids.get(&node.node_id).copied().unwrap_or(-1);
    }
}
