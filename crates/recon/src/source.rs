use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::Side;

/// One source table as delivered by an upstream parser.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSource {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
    /// Data-record position of each entry in `rows`. Skipped blank rows keep
    /// their position, so these can differ from the `rows` index.
    pub positions: Vec<usize>,
}

impl ParsedSource {
    /// Read CSV text with a header row.
    ///
    /// Headers are trimmed and a leading byte-order mark is dropped. Blank
    /// headers are named `column_N` (1-based). Short rows are padded with
    /// empty cells; extra cells past the last header are ignored. Rows with
    /// no non-blank cell are skipped but still count toward `positions`.
    pub fn from_csv(side: Side, csv_data: &str) -> Result<Self, ReconError> {
        let csv_err = |e: csv::Error| ReconError::Csv { side, message: e.to_string() };

        let data = csv_data.strip_prefix('\u{feff}').unwrap_or(csv_data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if h.is_empty() {
                    format!("column_{}", i + 1)
                } else {
                    h.to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        let mut positions = Vec::new();
        for (position, record) in reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            positions.push(position);
            let row = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
                .collect();
            rows.push(row);
        }

        log::debug!("source {side}: {} columns, {} rows", headers.len(), rows.len());
        Ok(Self { headers, rows, positions })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_rows() {
        let csv = "\u{feff}Date, Amount ,Reference\n2024-01-15,\"1,250.00\",INV-1\n2024-01-16,99.50,INV-2\n";
        let src = ParsedSource::from_csv(Side::A, csv).unwrap();

        assert_eq!(src.headers, vec!["Date", "Amount", "Reference"]);
        assert_eq!(src.len(), 2);
        assert_eq!(src.rows[0]["Amount"], "1,250.00");
        assert_eq!(src.rows[1]["Reference"], "INV-2");
    }

    #[test]
    fn ragged_and_blank_rows() {
        let csv = "a,b,\n1\n,,\n2,3,4,5\n";
        let src = ParsedSource::from_csv(Side::B, csv).unwrap();

        assert_eq!(src.headers, vec!["a", "b", "column_3"]);
        assert_eq!(src.len(), 2);
        assert_eq!(src.rows[0]["b"], "");
        assert_eq!(src.rows[1]["column_3"], "4");
        assert_eq!(src.rows[1].len(), 3);
        assert_eq!(src.positions, vec![0, 2]);
    }

    #[test]
    fn header_only_is_empty() {
        let src = ParsedSource::from_csv(Side::A, "amount,date\n").unwrap();
        assert!(src.is_empty());
        assert_eq!(src.headers.len(), 2);
    }

    #[test]
    fn quoted_cells_keep_commas_and_newlines() {
        let csv = "memo,amount\n\"Wire, ACME\nref 7\",10\n";
        let src = ParsedSource::from_csv(Side::B, csv).unwrap();
        assert_eq!(src.len(), 1);
        assert_eq!(src.rows[0]["memo"], "Wire, ACME\nref 7");
    }
}
