//! `geonorm concat` — join split output files back into one CSV.
//!
//! Part files are `<prefix><part>.csv` with a non-empty `<part>`, joined in
//! `<part>` order into `<prefix>.csv`. Every part must carry the standard
//! output header.

use std::path::{Path, PathBuf};

use crate::exit_codes::EXIT_CONCAT_INPUT;
use crate::CliError;

pub const EXPECTED_HEADER: [&str; 7] = ["prefecture", "city", "number", "address", "name", "lat", "long"];

fn concat_err(msg: impl Into<String>) -> CliError {
    CliError::new(EXIT_CONCAT_INPUT, msg)
}

/// `(part, path)` pairs for `<prefix>*.csv`, sorted by part.
fn find_parts(prefix: &str) -> Result<Vec<(String, PathBuf)>, CliError> {
    let prefix_path = Path::new(prefix);
    let dir = prefix_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let base = prefix_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::io(format!("invalid prefix: {prefix}")))?;

    let escaped_dir = PathBuf::from(glob::Pattern::escape(&dir.to_string_lossy()));
    let pattern = escaped_dir.join(format!("{}*.csv", glob::Pattern::escape(base)));
    let pattern = pattern.to_string_lossy().into_owned();
    let entries = glob::glob(&pattern).map_err(|e| CliError::io(format!("bad pattern {pattern}: {e}")))?;

    let mut parts = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CliError::io(e.to_string()))?;
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let part = name
            .strip_prefix(base)
            .and_then(|rest| rest.strip_suffix(".csv"))
            .unwrap_or("");
        if !part.is_empty() {
            parts.push((part.to_string(), path));
        }
    }
    parts.sort();

    if parts.is_empty() {
        return Err(concat_err(format!("no files match {pattern}")));
    }
    Ok(parts)
}

/// Read one part file, checking its header. Returns the data rows.
fn read_part(path: &Path) -> Result<Vec<csv::StringRecord>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record.map_err(|e| CliError::io(format!("{}: {e}", path.display())))?,
        None => return Err(concat_err(format!("{} is empty", path.display()))),
    };
    if header.iter().ne(EXPECTED_HEADER) {
        return Err(concat_err(format!("header mismatch in {}", path.display())).with_hint(format!(
            "expected: {}\n       actual:   {}",
            EXPECTED_HEADER.join(","),
            header.iter().collect::<Vec<_>>().join(","),
        )));
    }

    records
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::io(format!("{}: {e}", path.display())))
}

/// Concatenate every part; returns the output path and per-file row counts.
pub(crate) fn concat(prefix: &str) -> Result<(PathBuf, Vec<(PathBuf, usize)>), CliError> {
    let parts = find_parts(prefix)?;

    // Read everything first so a bad part leaves no partial output.
    let mut rows = Vec::new();
    let mut counts = Vec::new();
    for (_, path) in &parts {
        let part_rows = read_part(path)?;
        counts.push((path.clone(), part_rows.len()));
        rows.extend(part_rows);
    }

    let output = PathBuf::from(format!("{prefix}.csv"));
    let mut writer = csv::Writer::from_path(&output)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", output.display())))?;
    let write_err = |e: csv::Error| CliError::io(format!("cannot write {}: {e}", output.display()));
    writer.write_record(EXPECTED_HEADER).map_err(write_err)?;
    for row in &rows {
        writer.write_record(row).map_err(write_err)?;
    }
    writer.flush().map_err(|e| CliError::io(format!("cannot write {}: {e}", output.display())))?;

    Ok((output, counts))
}

pub fn cmd_concat(prefix: &str) -> Result<(), CliError> {
    let (output, counts) = concat(prefix)?;
    for (path, rows) in &counts {
        println!("{}: {} data rows", path.display(), rows);
    }
    println!("joined {} files into {}", counts.len(), output.display());
    Ok(())
}
