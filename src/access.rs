//! Nearest-access search: for each TAZ, the k nearest meso nodes inside the
//! routable core (the largest SCC).
//!
//! Candidates come from a bulk-loaded R-tree rather than a per-row distance
//! scan. Distance ties resolve by tree traversal order; no fixture may rely
//! on a specific tie outcome.

use rstar::{primitives::GeomWithData, RTree};

use crate::model::{NodeTable, TazCentroid};

/// Fill each TAZ's ranked candidate list with the `num_candidates` nearest
/// nodes whose `scc_id` is 0, by planar Euclidean distance.
///
/// If the routable core is empty every TAZ ends up with no candidates; the
/// caller decides whether that is fatal (the pipeline treats it as a
/// configuration error).
pub fn assign_access_candidates(
    tazs: &mut [TazCentroid],
    meso_nodes: &NodeTable,
    num_candidates: usize,
) {
    let core: Vec<GeomWithData<[f64; 2], i64>> = meso_nodes
        .rows
        .iter()
        .filter(|n| n.scc_id == 0)
        .map(|n| GeomWithData::new([n.x, n.y], n.node_id))
        .collect();
    let index = RTree::bulk_load(core);

    for taz in tazs.iter_mut() {
        taz.candidates = index
            .nearest_neighbor_iter(&[taz.x, taz.y])
            .take(num_candidates)
            .map(|point| point.data)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkNode;

    fn node(id: i64, x: f64, y: f64, scc_id: i64) -> NetworkNode {
        NetworkNode {
            node_id: id,
            x,
            y,
            scc_id,
            meso_link_id: None,
            zone_id: String::new(),
            extras: Vec::new(),
        }
    }

    fn taz(id: i64, x: f64, y: f64) -> TazCentroid {
        TazCentroid {
            id,
            x,
            y,
            candidates: Vec::new(),
        }
    }

    fn meso_table(nodes: Vec<NetworkNode>) -> NodeTable {
        NodeTable {
            extra_columns: Vec::new(),
            rows: nodes,
        }
    }

    #[test]
    fn test_candidates_sorted_by_distance() {
        let nodes = meso_table(vec![
            node(1, 10.0, 0.0, 0),
            node(2, 1.0, 0.0, 0),
            node(3, 5.0, 0.0, 0),
        ]);
        let mut tazs = vec![taz(100, 0.0, 0.0)];
        assign_access_candidates(&mut tazs, &nodes, 3);
        assert_eq!(tazs[0].candidates, vec![2, 3, 1]);
    }

    #[test]
    fn test_only_core_nodes_are_candidates() {
        // Node 9 is closest but outside the largest SCC.
        let nodes = meso_table(vec![
            node(9, 0.1, 0.0, 1),
            node(1, 2.0, 0.0, 0),
            node(2, 3.0, 0.0, -1),
        ]);
        let mut tazs = vec![taz(100, 0.0, 0.0)];
        assign_access_candidates(&mut tazs, &nodes, 2);
        assert_eq!(tazs[0].candidates, vec![1]);
    }

    #[test]
    fn test_candidate_count_clamped_to_core_size() {
        let nodes = meso_table(vec![node(1, 1.0, 0.0, 0), node(2, 2.0, 0.0, 0)]);
        let mut tazs = vec![taz(100, 0.0, 0.0)];
        assign_access_candidates(&mut tazs, &nodes, 5);
        assert_eq!(tazs[0].candidates.len(), 2);
    }

    #[test]
    fn test_empty_core_yields_no_candidates() {
        let nodes = meso_table(vec![node(1, 1.0, 0.0, -1), node(2, 2.0, 0.0, 3)]);
        let mut tazs = vec![taz(100, 0.0, 0.0), taz(101, 5.0, 5.0)];
        assign_access_candidates(&mut tazs, &nodes, 1);
        assert!(tazs.iter().all(|t| t.candidates.is_empty()));
    }
}
