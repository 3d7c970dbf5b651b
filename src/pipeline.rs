//! The merge pipeline: load, classify, locate access, reindex, synthesize
//! connectors, merge, export.
//!
//! Strictly sequential; each stage consumes the complete output of the
//! prior stage, and no stage mutates a table still owned by an earlier one.

use std::fs;
use std::path::PathBuf;

use log::info;

use crate::error::{Error, Result};
use crate::shift::ShiftPlan;
use crate::{access, connectors, io, merge, micro, scc};

/// Input locations and tuning for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub meso_nodes: PathBuf,
    pub meso_links: PathBuf,
    pub micro_nodes: PathBuf,
    pub micro_links: PathBuf,
    pub taz: PathBuf,
    pub outdir: PathBuf,
    /// Candidate access nodes ranked per TAZ (>= 1).
    pub num_candidates: usize,
}

/// Row counts from a completed run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineReport {
    pub scc_count: usize,
    pub core_size: usize,
    pub taz_count: usize,
    pub meso_connector_count: usize,
    pub micro_connector_count: usize,
    pub node_count: usize,
    pub link_count: usize,
}

/// Run the full merge pipeline and write the three output tables into
/// `config.outdir`.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport> {
    fs::create_dir_all(&config.outdir)?;

    info!("loading network layers");
    let mut meso_nodes = io::read_meso_nodes(&config.meso_nodes)?;
    let meso_links = io::read_meso_links(&config.meso_links)?;
    let mut micro_nodes = io::read_micro_nodes(&config.micro_nodes)?;
    let micro_links = io::read_micro_links(&config.micro_links)?;
    let mut tazs = io::read_taz_centroids(&config.taz)?;
    info!(
        "loaded {} meso nodes, {} meso links, {} micro nodes, {} micro links, {} TAZ centroids",
        meso_nodes.rows.len(),
        meso_links.rows.len(),
        micro_nodes.rows.len(),
        micro_links.rows.len(),
        tazs.len()
    );

    // Stage 1: classify the meso network and export the annotation.
    let scc_ids = scc::compute_scc_ids(&meso_links);
    scc::annotate_nodes(&mut meso_nodes, &scc_ids);
    let scc_count = scc_ids.values().max().map(|&m| m as usize + 1).unwrap_or(0);
    let core_size = meso_nodes.rows.iter().filter(|n| n.scc_id == 0).count();
    let scc_path = config.outdir.join("meso_nodes_with_scc.csv");
    io::write_scc_annotated_nodes(&scc_path, &meso_nodes)?;
    info!(
        "classified {} SCCs, routable core has {} nodes, wrote {}",
        scc_count,
        core_size,
        scc_path.display()
    );
    if core_size == 0 {
        return Err(Error::EmptyRoutableCore);
    }

    // Stage 2: nearest routable-core candidates per TAZ.
    access::assign_access_candidates(&mut tazs, &meso_nodes, config.num_candidates.max(1));

    // Stage 3: downstream micro entry nodes per TAZ.
    let micro_map = micro::map_taz_to_micro_nodes(&tazs, &meso_links, &micro_links, &micro_nodes);
    info!("mapped {} (TAZ, micro entry node) pairs", micro_map.len());

    // Stages 4 and 5: reindex into disjoint id spaces, then synthesize
    // connectors against the shifted node ids.
    let plan = ShiftPlan::compute(&tazs, &meso_nodes, &micro_nodes);
    plan.apply_to_nodes(&mut meso_nodes, &mut micro_nodes);
    plan.verify_node_ranges(&meso_nodes, &micro_nodes)?;
    let meso_connectors = connectors::generate_meso_connectors(&tazs, &meso_nodes, &plan)?;
    let micro_connectors = connectors::generate_micro_connectors(&tazs, &micro_map, &plan)?;
    let meso_connector_count = meso_connectors.rows.len();
    let micro_connector_count = micro_connectors.rows.len();
    info!(
        "generated {} meso and {} micro connector links",
        meso_connector_count, micro_connector_count
    );

    // Stage 6: merge and export.
    let merged = merge::merge_layers(
        meso_links,
        meso_connectors,
        micro_links,
        micro_connectors,
        &meso_nodes,
        &micro_nodes,
        &tazs,
        &plan,
    )?;
    let nodes_path = config.outdir.join("final_nodes.csv");
    let links_path = config.outdir.join("final_links.csv");
    io::write_final_nodes(&nodes_path, &merged.nodes)?;
    io::write_final_links(&links_path, &merged)?;
    info!("wrote {} and {}", nodes_path.display(), links_path.display());

    Ok(PipelineReport {
        scc_count,
        core_size,
        taz_count: tazs.len(),
        meso_connector_count,
        micro_connector_count,
        node_count: merged.nodes.len(),
        link_count: merged.link_rows.len(),
    })
}
