//! Tab-separated input and output.
//!
//! Spreadsheets: the first line holds a corner cell followed by the column labels,
//! every following line a row label followed by one value per column. Blank lines are
//! skipped. Network files: one edge per line, `node_a <tab> node_b <tab> weight`, any
//! further fields ignored; a header line whose weight does not parse is skipped.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, info};

use crate::config::RunParameters;
use crate::errors::{ConsensusError, Result};
use crate::matrix::LabeledMatrix;
use crate::network::GeneNetwork;

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> ConsensusError {
    ConsensusError::Parse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

/// Parse spreadsheet text; `path` only labels errors.
pub fn parse_spreadsheet(text: &str, path: &Path) -> Result<LabeledMatrix> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| parse_error(path, 1, "empty spreadsheet"))?;
    let col_labels: Vec<String> = header
        .split('\t')
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();

    let mut row_labels = Vec::new();
    let mut rows = Vec::new();
    for (line_no, line) in lines {
        let mut fields = line.split('\t');
        let label = fields.next().unwrap_or("").trim().to_string();
        let values = fields
            .map(|s| {
                s.trim()
                    .parse::<f64>()
                    .map_err(|e| parse_error(path, line_no, format!("{:?}: {}", s, e)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != col_labels.len() {
            return Err(parse_error(
                path,
                line_no,
                format!("{} values for {} columns", values.len(), col_labels.len()),
            ));
        }
        row_labels.push(label);
        rows.push(values);
    }

    LabeledMatrix::from_rows(&rows, row_labels, col_labels)
}

pub fn read_spreadsheet(path: &Path) -> Result<LabeledMatrix> {
    let text = fs::read_to_string(path).map_err(|e| ConsensusError::io(path, e))?;
    let matrix = parse_spreadsheet(&text, path)?;
    info!("Loaded {:?}: {:?}", path, matrix.shape());
    Ok(matrix)
}

pub fn parse_edges(text: &str, path: &Path) -> Result<Vec<(String, String, f64)>> {
    let mut edges = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(|s| s.trim()).collect();
        if fields.len() < 3 {
            return Err(parse_error(path, i + 1, "expected node_a, node_b, weight"));
        }
        match fields[2].parse::<f64>() {
            Ok(w) => edges.push((fields[0].to_string(), fields[1].to_string(), w)),
            Err(_) if i == 0 => debug!("Skipping network header {:?}", line),
            Err(e) => return Err(parse_error(path, i + 1, e.to_string())),
        }
    }
    Ok(edges)
}

pub fn read_network(path: &Path) -> Result<GeneNetwork> {
    let text = fs::read_to_string(path).map_err(|e| ConsensusError::io(path, e))?;
    GeneNetwork::from_edges(&parse_edges(&text, path)?)
}

pub fn format_matrix(matrix: &LabeledMatrix) -> String {
    let mut out = String::new();
    for label in matrix.col_labels() {
        out.push('\t');
        out.push_str(label);
    }
    out.push('\n');
    for (i, label) in matrix.row_labels().iter().enumerate() {
        out.push_str(label);
        for j in 0..matrix.ncols() {
            let _ = write!(out, "\t{}", matrix.get(i, j));
        }
        out.push('\n');
    }
    out
}

pub fn write_matrix(matrix: &LabeledMatrix, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConsensusError::io(parent, e))?;
    }
    fs::write(path, format_matrix(matrix)).map_err(|e| ConsensusError::io(path, e))?;
    info!("Wrote {:?} table to {:?}", matrix.shape(), path);
    Ok(())
}

/// `{results_directory}/{prefix}_{method}_{measure}_{timestamp}_{suffix}.{extension}`
pub fn output_file_name(
    params: &RunParameters,
    prefix: &str,
    suffix: &str,
    extension: &str,
) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
    params.results_directory.join(format!(
        "{}_{}_{}_{}_{}.{}",
        prefix, params.method, params.similarity_measure, stamp, suffix, extension
    ))
}

/// Write a pipeline result under a timestamped name; returns the path written.
pub fn save_result(result: &LabeledMatrix, params: &RunParameters) -> Result<PathBuf> {
    let path = output_file_name(params, "result", "viz", "tsv");
    write_matrix(result, &path)?;
    Ok(path)
}
