//! Fixture files: JSON array, NDJSON or CSV with a header row.

use crate::errors::DbError;
use crate::utils::json::{json_value_to_bson_document, parse_json_to_bson_document};
use bson::{Bson, Document as BsonDocument};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFormat {
    JsonArray,
    Ndjson,
    Csv,
}

/// Picks a format from the extension, falling back to sniffing the first bytes.
///
/// # Errors
/// Returns an I/O error if the reader cannot be peeked.
pub fn detect_format<R: BufRead>(reader: &mut R, path: &Path) -> Result<FixtureFormat, DbError> {
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_lowercase);
    match ext.as_deref() {
        Some("jsonl" | "ndjson") => return Ok(FixtureFormat::Ndjson),
        Some("csv") => return Ok(FixtureFormat::Csv),
        _ => {}
    }
    let buf = reader.fill_buf()?;
    let head = String::from_utf8_lossy(&buf[..buf.len().min(256)]);
    let head = head.trim_start();
    Ok(if head.starts_with('[') {
        FixtureFormat::JsonArray
    } else if head.starts_with('{') {
        FixtureFormat::Ndjson
    } else {
        FixtureFormat::Csv
    })
}

fn infer_field(field: &str) -> Bson {
    if let Ok(i) = field.parse::<i32>() {
        return Bson::Int32(i);
    }
    if let Ok(i) = field.parse::<i64>() {
        return Bson::Int64(i);
    }
    // `f64::from_str` also accepts "inf" and "NaN"; those stay text
    if field.bytes().any(|b| b.is_ascii_digit())
        && let Ok(f) = field.parse::<f64>()
        && f.is_finite()
    {
        return Bson::Double(f);
    }
    match field.to_lowercase().as_str() {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        "" => Bson::Null,
        _ => Bson::String(field.to_string()),
    }
}

fn read_csv<R: Read>(reader: R) -> Result<Vec<BsonDocument>, DbError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(ToString::to_string).collect();
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let mut doc = BsonDocument::new();
        for (i, field) in rec.iter().enumerate() {
            let key = headers.get(i).cloned().unwrap_or_else(|| format!("field_{i}"));
            doc.insert(key, infer_field(field));
        }
        out.push(doc);
    }
    Ok(out)
}

fn read_ndjson<R: BufRead>(reader: R) -> Result<Vec<BsonDocument>, DbError> {
    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let doc = parse_json_to_bson_document(trimmed)
            .map_err(|e| DbError::Fixture(format!("line {}: {e}", n + 1)))?;
        out.push(doc);
    }
    Ok(out)
}

fn read_json_array<R: Read>(reader: R) -> Result<Vec<BsonDocument>, DbError> {
    let val: serde_json::Value = serde_json::from_reader(reader)?;
    let serde_json::Value::Array(items) = val else {
        return Err(DbError::Fixture("expected a JSON array of documents".into()));
    };
    items.iter().map(json_value_to_bson_document).collect()
}

/// # Errors
/// Returns an error when the input does not match `format`.
pub fn load_books_from_reader<R: BufRead>(
    reader: R,
    format: FixtureFormat,
) -> Result<Vec<BsonDocument>, DbError> {
    match format {
        FixtureFormat::JsonArray => read_json_array(reader),
        FixtureFormat::Ndjson => read_ndjson(reader),
        FixtureFormat::Csv => read_csv(reader),
    }
}

/// Loads a fixture file as raw documents, in file order.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_books(path: &Path) -> Result<Vec<BsonDocument>, DbError> {
    let mut reader = BufReader::new(std::fs::File::open(path)?);
    let format = detect_format(&mut reader, path)?;
    let docs = load_books_from_reader(reader, format)?;
    log::debug!("loaded {} fixture documents from {} as {format:?}", docs.len(), path.display());
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_infers_types() {
        let data = "title,published_year,price,in_stock\nDune,1965,9.5,true\n";
        let docs = load_books_from_reader(data.as_bytes(), FixtureFormat::Csv).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get_str("title").unwrap(), "Dune");
        assert_eq!(docs[0].get_i32("published_year").unwrap(), 1965);
        assert_eq!(docs[0].get_f64("price").unwrap(), 9.5);
        assert!(docs[0].get_bool("in_stock").unwrap());
    }

    #[test]
    fn csv_keeps_non_numeric_words_as_text() {
        let data = "title,price\nInfinity,1e400\nNaN,-inf\n";
        let docs = load_books_from_reader(data.as_bytes(), FixtureFormat::Csv).unwrap();
        assert_eq!(docs[0].get_str("title").unwrap(), "Infinity");
        assert_eq!(docs[0].get_str("price").unwrap(), "1e400");
        assert_eq!(docs[1].get_str("title").unwrap(), "NaN");
        assert_eq!(docs[1].get_str("price").unwrap(), "-inf");
    }

    #[test]
    fn sniffs_json_array_without_extension() {
        let mut f = tempfile::Builder::new().suffix(".data").tempfile().unwrap();
        write!(f, "  [{{\"title\": \"Emma\"}}, {{\"title\": \"Persuasion\"}}]").unwrap();
        let docs = load_books(f.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].get_str("title").unwrap(), "Persuasion");
    }

    #[test]
    fn ndjson_reports_bad_line() {
        let data = "{\"title\": \"a\"}\n\n[1]\n";
        let err = load_books_from_reader(data.as_bytes(), FixtureFormat::Ndjson).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
