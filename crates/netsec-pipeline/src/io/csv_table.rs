//! Comma (or tab) separated tables with a header row.
use std::path::Path;

use csv::StringRecord;
use ndarray::Array2;

use crate::data_handling::{is_missing_token, Table};
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::io::ensure_parent_dir;

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Read a table. `.tsv` files are tab separated; everything else uses commas.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .from_path(path)
        .or_kind(ErrorKind::Persistence, || {
            format!("Failed to open table: {}", path.display())
        })?;

    let headers: Vec<String> = reader
        .headers()
        .or_kind(ErrorKind::DataFormat, || {
            format!("Failed to read header row of {}", path.display())
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut flat: Vec<f64> = Vec::new();
    let mut n_rows = 0usize;
    let mut record = StringRecord::new();
    loop {
        let more = reader.read_record(&mut record).or_kind(ErrorKind::DataFormat, || {
            format!("Failed to read row {} of {}", n_rows + 1, path.display())
        })?;
        if !more {
            break;
        }
        if record.len() != headers.len() {
            return Err(PipelineError::data_format(format!(
                "{}: row {} has {} fields, header has {}",
                path.display(),
                n_rows + 1,
                record.len(),
                headers.len()
            )));
        }
        for (field, name) in record.iter().zip(&headers) {
            flat.push(parse_field(field).ok_or_else(|| {
                PipelineError::data_format(format!(
                    "{}: non-numeric value '{}' in column '{}' (row {})",
                    path.display(),
                    field,
                    name,
                    n_rows + 1
                ))
            })?);
        }
        n_rows += 1;
    }

    let values = Array2::from_shape_vec((n_rows, headers.len()), flat)
        .or_kind(ErrorKind::DataFormat, || format!("Malformed table {}", path.display()))?;
    log::debug!(
        "Read {} rows x {} columns from {}",
        n_rows,
        headers.len(),
        path.display()
    );
    Table::new(headers, values)
}

fn parse_field(field: &str) -> Option<f64> {
    if is_missing_token(field) {
        return Some(f64::NAN);
    }
    field.trim().parse::<f64>().ok()
}

/// Write a table with a header row. Missing values become empty fields.
pub fn write_table<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter_for(path))
        .from_path(path)
        .or_kind(ErrorKind::Persistence, || {
            format!("Failed to create {}", path.display())
        })?;

    writer
        .write_record(table.columns())
        .or_kind(ErrorKind::Persistence, || {
            format!("Failed to write header to {}", path.display())
        })?;
    for row in table.values().rows() {
        let fields = row.iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        });
        writer.write_record(fields).or_kind(ErrorKind::Persistence, || {
            format!("Failed to write row to {}", path.display())
        })?;
    }
    writer
        .flush()
        .or_kind(ErrorKind::Persistence, || format!("Failed to flush {}", path.display()))?;
    log::debug!("Wrote {} rows to {}", table.n_rows(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn write_then_read_keeps_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("t.csv");
        let table = Table::new(
            vec!["a".into(), "b".into()],
            array![[1.5, f64::NAN], [-1.0, 3.0]],
        )
        .unwrap();
        write_table(&table, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a,b\n1.5,\n-1,3\n");

        let back = read_table(&path).unwrap();
        assert_eq!(back.columns(), table.columns());
        assert_eq!(back.values()[(0, 0)], 1.5);
        assert!(back.values()[(0, 1)].is_nan());
    }

    #[test]
    fn read_accepts_tokens_and_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tsv");
        std::fs::write(&path, "x\ty\n1\tna\nNaN\t2\n").unwrap();
        let table = read_table(&path).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert!(table.values()[(0, 1)].is_nan());
        assert!(table.values()[(1, 0)].is_nan());
    }

    #[test]
    fn read_rejects_text_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "x\nhttp://phish\n").unwrap();
        let err = read_table(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn read_missing_file_is_persistence_error() {
        let err = read_table("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
