//! CSV loading with column validation, and export of the merged tables.
//!
//! The loaders validate required columns up front and reject a file with one
//! error naming every missing column. All other columns pass through
//! untouched and reappear in the exports that preserve them.

use std::collections::HashSet;
use std::path::Path;

use csv::{Reader, StringRecord, Writer};

use crate::error::{Error, Result};
use crate::merge::MergedNetwork;
use crate::model::{FinalNode, LinkTable, NetworkLink, NetworkNode, NodeTable, TazCentroid};

const MESO_NODE_COLUMNS: &[&str] = &["node_id", "x_coord", "y_coord"];
const MICRO_NODE_COLUMNS: &[&str] = &["node_id", "x_coord", "y_coord", "meso_link_id", "lane_no"];
const MESO_LINK_COLUMNS: &[&str] = &["link_id", "from_node_id", "to_node_id"];
const MICRO_LINK_COLUMNS: &[&str] = &["link_id", "from_node_id", "to_node_id", "meso_link_id", "lane_no"];
const TAZ_COLUMNS: &[&str] = &["TAZ_clean", "x_coord", "y_coord"];

pub fn read_meso_nodes(path: &Path) -> Result<NodeTable> {
    read_nodes(path, MESO_NODE_COLUMNS, false)
}

pub fn read_micro_nodes(path: &Path) -> Result<NodeTable> {
    read_nodes(path, MICRO_NODE_COLUMNS, true)
}

pub fn read_meso_links(path: &Path) -> Result<LinkTable> {
    read_links(path, MESO_LINK_COLUMNS, false)
}

pub fn read_micro_links(path: &Path) -> Result<LinkTable> {
    read_links(path, MICRO_LINK_COLUMNS, true)
}

fn open(path: &Path) -> Result<(Reader<std::fs::File>, StringRecord)> {
    let mut reader = Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    Ok((reader, headers))
}

fn validate_columns(headers: &StringRecord, required: &[&str], file: &str) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingColumns {
            file: file.to_string(),
            columns: missing,
        })
    }
}

fn column_index(headers: &StringRecord, name: &str) -> usize {
    headers
        .iter()
        .position(|h| h == name)
        .expect("column validated before lookup")
}

fn parse_i64(raw: &str, file: &str, row: usize, column: &str) -> Result<i64> {
    raw.trim().parse().map_err(|_| Error::InvalidValue {
        file: file.to_string(),
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn parse_f64(raw: &str, file: &str, row: usize, column: &str) -> Result<f64> {
    raw.trim().parse().map_err(|_| Error::InvalidValue {
        file: file.to_string(),
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn read_nodes(path: &Path, required: &[&str], micro: bool) -> Result<NodeTable> {
    let file = path.display().to_string();
    let (mut reader, headers) = open(path)?;
    validate_columns(&headers, required, &file)?;

    let id_ix = column_index(&headers, "node_id");
    let x_ix = column_index(&headers, "x_coord");
    let y_ix = column_index(&headers, "y_coord");
    let meso_link_ix = micro.then(|| column_index(&headers, "meso_link_id"));

    // scc_id is recomputed by the classifier, so an incoming scc_id column is
    // dropped rather than duplicated in the annotated export.
    let mut typed: HashSet<usize> = [id_ix, x_ix, y_ix].into();
    typed.extend(meso_link_ix);
    if let Some(ix) = headers.iter().position(|h| h == "scc_id") {
        typed.insert(ix);
    }
    let extra_ixs: Vec<usize> = (0..headers.len()).filter(|ix| !typed.contains(ix)).collect();
    let extra_columns: Vec<String> = extra_ixs.iter().map(|&ix| headers[ix].to_string()).collect();

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        let get = |ix: usize| record.get(ix).unwrap_or("");
        rows.push(NetworkNode {
            node_id: parse_i64(get(id_ix), &file, row_no, "node_id")?,
            x: parse_f64(get(x_ix), &file, row_no, "x_coord")?,
            y: parse_f64(get(y_ix), &file, row_no, "y_coord")?,
            scc_id: -1,
            meso_link_id: match meso_link_ix {
                Some(ix) => Some(parse_i64(get(ix), &file, row_no, "meso_link_id")?),
                None => None,
            },
            zone_id: String::new(),
            extras: extra_ixs.iter().map(|&ix| get(ix).to_string()).collect(),
        });
    }
    Ok(NodeTable { extra_columns, rows })
}

fn read_links(path: &Path, required: &[&str], micro: bool) -> Result<LinkTable> {
    let file = path.display().to_string();
    let (mut reader, headers) = open(path)?;
    validate_columns(&headers, required, &file)?;

    let id_ix = column_index(&headers, "link_id");
    let from_ix = column_index(&headers, "from_node_id");
    let to_ix = column_index(&headers, "to_node_id");
    let meso_link_ix = micro.then(|| column_index(&headers, "meso_link_id"));
    let link_type_ix = headers.iter().position(|h| h == "link_type");

    // The merger owns the layer column; an incoming one would collide.
    let mut typed: HashSet<usize> = [id_ix, from_ix, to_ix].into();
    typed.extend(meso_link_ix);
    typed.extend(link_type_ix);
    if let Some(ix) = headers.iter().position(|h| h == "layer") {
        typed.insert(ix);
    }
    let extra_ixs: Vec<usize> = (0..headers.len()).filter(|ix| !typed.contains(ix)).collect();
    let extra_columns: Vec<String> = extra_ixs.iter().map(|&ix| headers[ix].to_string()).collect();

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        let get = |ix: usize| record.get(ix).unwrap_or("");
        let link_type = match link_type_ix {
            Some(ix) if !get(ix).trim().is_empty() => {
                Some(parse_i64(get(ix), &file, row_no, "link_type")?)
            }
            _ => None,
        };
        rows.push(NetworkLink {
            link_id: parse_i64(get(id_ix), &file, row_no, "link_id")?,
            from_node_id: parse_i64(get(from_ix), &file, row_no, "from_node_id")?,
            to_node_id: parse_i64(get(to_ix), &file, row_no, "to_node_id")?,
            link_type,
            meso_link_id: match meso_link_ix {
                Some(ix) => Some(parse_i64(get(ix), &file, row_no, "meso_link_id")?),
                None => None,
            },
            extras: extra_ixs.iter().map(|&ix| get(ix).to_string()).collect(),
        });
    }
    Ok(LinkTable {
        extra_columns,
        has_meso_link_id: micro,
        rows,
    })
}

/// Load TAZ centroids. Identifiers must be unique; they become node ids.
pub fn read_taz_centroids(path: &Path) -> Result<Vec<TazCentroid>> {
    let file = path.display().to_string();
    let (mut reader, headers) = open(path)?;
    validate_columns(&headers, TAZ_COLUMNS, &file)?;

    let id_ix = column_index(&headers, "TAZ_clean");
    let x_ix = column_index(&headers, "x_coord");
    let y_ix = column_index(&headers, "y_coord");

    let mut seen = HashSet::new();
    let mut tazs = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        let get = |ix: usize| record.get(ix).unwrap_or("");
        let id = parse_i64(get(id_ix), &file, row_no, "TAZ_clean")?;
        if !seen.insert(id) {
            return Err(Error::DuplicateTaz {
                taz_id: id,
                file,
            });
        }
        tazs.push(TazCentroid {
            id,
            x: parse_f64(get(x_ix), &file, row_no, "x_coord")?,
            y: parse_f64(get(y_ix), &file, row_no, "y_coord")?,
            candidates: Vec::new(),
        });
    }
    Ok(tazs)
}

/// Export meso nodes with their `scc_id` annotation, preserving passthrough
/// columns from the input table.
pub fn write_scc_annotated_nodes(path: &Path, nodes: &NodeTable) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    let mut header = vec!["node_id".to_string(), "x_coord".to_string(), "y_coord".to_string()];
    header.extend(nodes.extra_columns.iter().cloned());
    header.push("scc_id".to_string());
    writer.write_record(&header)?;

    for node in &nodes.rows {
        let mut record = vec![
            node.node_id.to_string(),
            node.x.to_string(),
            node.y.to_string(),
        ];
        record.extend(node.extras.iter().cloned());
        record.push(node.scc_id.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export the merged node table (`node_id, x, y, zone_id, layer`).
pub fn write_final_nodes(path: &Path, nodes: &[FinalNode]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for node in nodes {
        writer.serialize(node)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export the merged link table with its unified column set.
pub fn write_final_links(path: &Path, merged: &MergedNetwork) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(&merged.link_columns)?;
    for row in &merged.link_rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
