use super::runner::OutputMode;
use crate::utils::json::bson_document_to_json;
use bson::Document as BsonDocument;
use std::io::{self, Write};

/// NDJSON for plain/human output, one pretty array for JSON output.
pub fn write_documents<W: Write>(out: &mut W, docs: &[BsonDocument], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => {
            let arr: Vec<serde_json::Value> = docs.iter().map(bson_document_to_json).collect();
            serde_json::to_writer_pretty(&mut *out, &arr)?;
            writeln!(out)
        }
        OutputMode::Plain | OutputMode::Human => {
            for d in docs {
                writeln!(out, "{}", bson_document_to_json(d))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_has_one_line_per_document() {
        let docs = vec![bson::doc! {"a": 1}, bson::doc! {"a": 2}];
        let mut buf = Vec::new();
        write_documents(&mut buf, &docs, OutputMode::Plain).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert_eq!(s.lines().collect::<Vec<_>>(), ["{\"a\":1}", "{\"a\":2}"]);
    }
}
