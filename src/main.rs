use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use netweave::{run_pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "netweave")]
#[command(version, about = "Merge meso/micro network layers and TAZ centroids into one graph", long_about = None)]
struct Cli {
    /// Meso node CSV (node_id, x_coord, y_coord)
    #[arg(long, value_name = "FILE")]
    meso_nodes: PathBuf,

    /// Meso link CSV (link_id, from_node_id, to_node_id)
    #[arg(long, value_name = "FILE")]
    meso_links: PathBuf,

    /// Micro node CSV (node_id, x_coord, y_coord, meso_link_id, lane_no)
    #[arg(long, value_name = "FILE")]
    micro_nodes: PathBuf,

    /// Micro link CSV (link_id, from_node_id, to_node_id, meso_link_id, lane_no)
    #[arg(long, value_name = "FILE")]
    micro_links: PathBuf,

    /// TAZ centroid CSV (TAZ_clean, x_coord, y_coord)
    #[arg(long, value_name = "FILE")]
    taz: PathBuf,

    /// Output directory for the merged tables
    #[arg(short, long, value_name = "DIR")]
    outdir: PathBuf,

    /// Candidate access nodes ranked per TAZ
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    num_candidates: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = PipelineConfig {
        meso_nodes: cli.meso_nodes,
        meso_links: cli.meso_links,
        micro_nodes: cli.micro_nodes,
        micro_links: cli.micro_links,
        taz: cli.taz,
        outdir: cli.outdir.clone(),
        num_candidates: cli.num_candidates as usize,
    };
    let report = run_pipeline(&config)?;

    println!("Network merge and connector generation complete.");
    println!("  Output: {}", cli.outdir.display());
    println!(
        "  SCCs: {} (routable core: {} nodes)",
        report.scc_count, report.core_size
    );
    println!(
        "  Connectors: {} meso + {} micro for {} TAZs",
        report.meso_connector_count, report.micro_connector_count, report.taz_count
    );
    println!(
        "  Merged tables: {} nodes, {} links",
        report.node_count, report.link_count
    );
    Ok(())
}
