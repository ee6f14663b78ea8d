//! CSV export loader.
//!
//! Reads any marketplace export into `RawRow`s: header names are kept as-is
//! (column detection happens in the normalizer), cells are trimmed, short
//! rows are padded with empty cells and extra cells are dropped. Exports
//! that are not valid UTF-8 are decoded as Latin-1, and a leading byte-order
//! mark is dropped.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

use stylepulse_engine::{RawRow, SourceKind};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error at line {line}: {source}")]
    Csv {
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode raw bytes: UTF-8 when valid, Latin-1 otherwise. A BOM is removed.
fn decode(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("input is not valid UTF-8, decoding as Latin-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Load raw rows from a CSV reader.
pub fn load_raw_rows<R: Read>(mut reader: R, source: SourceKind) -> Result<Vec<RawRow>, LoadError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|e| LoadError::Io {
        path: format!("<{} input>", source),
        source: e,
    })?;
    let text = decode(bytes);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| LoadError::Csv { line: 1, source: e })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (line_num, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::Csv {
            line: line_num + 2,
            source: e,
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(RawRow { source, cells });
    }

    log::debug!("loaded {} {} rows ({} columns)", rows.len(), source, headers.len());
    Ok(rows)
}

/// Load raw rows from a CSV file path.
pub fn load_raw_rows_file(path: impl AsRef<Path>, source: SourceKind) -> Result<Vec<RawRow>, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_raw_rows(file, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
Created On,Style ID,Final Price,Brand
2024-06-01, ABC-1 ,799,Acme
2024-06-02,abc-2,1299
,,,
2024-06-03,XYZ,499,Other,extra
";

    #[test]
    fn load_sample_csv() {
        let rows = load_raw_rows(SAMPLE_CSV.as_bytes(), SourceKind::Sales).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].source, SourceKind::Sales);
        assert_eq!(rows[0].get("Style ID"), Some("ABC-1"));
        assert_eq!(rows[0].get("Brand"), Some("Acme"));
        // short row: missing trailing cells are empty
        assert_eq!(rows[1].get("Brand"), Some(""));
        // long row: extra cells are dropped
        assert_eq!(rows[2].cells.len(), 4);
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let data = "\u{feff}Style ID,Date\nA,2024-06-01\n";
        let rows = load_raw_rows(data.as_bytes(), SourceKind::Catalog).unwrap();
        assert_eq!(rows[0].get("Style ID"), Some("A"));
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        // "Café" in Latin-1: 0xE9 is not valid UTF-8 on its own
        let mut data = b"Style ID,Brand\nA,Caf".to_vec();
        data.push(0xE9);
        data.push(b'\n');
        let rows = load_raw_rows(data.as_slice(), SourceKind::Catalog).unwrap();
        assert_eq!(rows[0].get("Brand"), Some("Café"));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let rows = load_raw_rows("Style ID,Date\n".as_bytes(), SourceKind::Sales).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_raw_rows_file("/nonexistent/sales.csv", SourceKind::Sales).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/sales.csv"));
    }
}
