//! Column data ingest.
//!
//! Turns whitespace-delimited text into raw `(x, y, σy)` columns:
//!
//! - `#` comment lines and blank lines are ignored
//! - the first data line decides the layout: 3+ fields means `x y sy`, else `x y`
//! - in a 3-column file every data line must carry a third field
//! - lines with fewer than 2 fields are skipped
//!
//! Values that fail to parse become NaN. Rejecting them is the
//! orchestrator's job (`load_dataset`), not this module's.

use std::fs;
use std::path::Path;

use crate::error::{AppError, ParseError};

/// Raw columns as read from the source, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedColumns {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Empty for 2-column sources.
    pub sigma_y: Vec<f64>,
}

impl ParsedColumns {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn has_sigma(&self) -> bool {
        !self.sigma_y.is_empty()
    }
}

/// Parse column text. See the module docs for the accepted layout.
pub fn parse_columns(text: &str) -> Result<ParsedColumns, ParseError> {
    let mut out = ParsedColumns::default();
    let mut three_columns: Option<bool> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let has_sigma = *three_columns.get_or_insert(fields.len() >= 3);

        if has_sigma && fields.len() == 2 {
            return Err(ParseError::MalformedRow {
                line: idx + 1,
                found: fields.len(),
            });
        }
        if fields.len() < 2 {
            continue;
        }

        out.x.push(parse_field(fields[0]));
        out.y.push(parse_field(fields[1]));
        if has_sigma {
            out.sigma_y.push(parse_field(fields[2]));
        }
    }

    Ok(out)
}

/// Read and parse a column file from disk.
pub fn read_columns_file(path: &Path) -> Result<ParsedColumns, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read data file '{}': {e}", path.display())))?;
    let parsed = parse_columns(&text)
        .map_err(|e| AppError::new(2, format!("Failed to parse '{}': {e}", path.display())))?;
    log::info!("read {} rows from {}", parsed.len(), path.display());
    Ok(parsed)
}

fn parse_field(field: &str) -> f64 {
    field.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn two_column_file_has_no_sigma() {
        let text = "# x y\n\n0 1\n1 2.5\n  2\t4  \n";
        let parsed = parse_columns(text).unwrap();
        assert_eq!(parsed.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(parsed.y, vec![1.0, 2.5, 4.0]);
        assert!(parsed.sigma_y.is_empty());
        assert!(!parsed.has_sigma());
    }

    #[test]
    fn three_column_file_keeps_sigma() {
        let text = "#q I sI\n0.1 10 1\n0.2 8 0.5 extra\n";
        let parsed = parse_columns(text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.sigma_y, vec![1.0, 0.5]);
    }

    #[test]
    fn short_row_in_three_column_file_is_fatal() {
        let text = "# header\n0 1 0.1\n1 2\n2 3 0.1\n";
        assert_eq!(
            parse_columns(text),
            Err(ParseError::MalformedRow { line: 3, found: 2 })
        );
    }

    #[test]
    fn single_field_lines_are_skipped() {
        let text = "0 1\n42\n1 2\n";
        let parsed = parse_columns(text).unwrap();
        assert_eq!(parsed.x, vec![0.0, 1.0]);

        let text = "0 1 0.1\n42\n1 2 0.2\n";
        let parsed = parse_columns(text).unwrap();
        assert_eq!(parsed.sigma_y, vec![0.1, 0.2]);
    }

    #[test]
    fn non_numeric_fields_become_nan() {
        let parsed = parse_columns("0 abc\n1 2\n").unwrap();
        assert!(parsed.y[0].is_nan());
        assert_eq!(parsed.y[1], 2.0);
    }

    #[test]
    fn comments_only_gives_empty_columns() {
        let parsed = parse_columns("# nothing\n   # still nothing\n").unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 1").unwrap();
        writeln!(file, "1 1 1").unwrap();
        let parsed = read_columns_file(file.path()).unwrap();
        assert_eq!(parsed.len(), 2);

        let missing = read_columns_file(Path::new("/definitely/not/here.dat")).unwrap_err();
        assert_eq!(missing.exit_code(), 2);
    }
}
