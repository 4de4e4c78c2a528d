// Ingestion Pipeline - CSV upload → candidate batch → one upsert
//
// Input layout (header row is skipped, never checked):
//   Name, Strategy, AUM (USD), Inception Date
//   Amazing Fund 1,Long/Short Equity,355000000,2011-03-10
//   Another Fund Y,Global Macro,,

use crate::db::{upsert_batch, UpsertReport};
use crate::entities::CandidateRecord;
use crate::error::FundError;
use csv::{ReaderBuilder, StringRecord};
use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Canonical field names, in the positional order of the upload format
pub const FIELD_NAMES: [&str; 4] = ["name", "strategy", "aum", "inception_date"];

/// Decode and parse an upload into normalized candidates.
///
/// The first row is always discarded. Every other row must have exactly
/// four fields; blank fields become `None`.
pub fn parse_funds(bytes: &[u8]) -> Result<Vec<CandidateRecord>, FundError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        warn!(error = %e, "upload is not valid UTF-8");
        FundError::from(e)
    })?;

    // has_headers consumes the first row; flexible lets us report arity ourselves
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut candidates = Vec::new();

    for result in reader.records() {
        let record = result?;
        candidates.push(candidate_from_record(&record)?);
    }

    debug!(rows = candidates.len(), "parsed upload");
    Ok(candidates)
}

/// Parse an upload and merge it into the store with a single batched upsert.
///
/// Nothing is written unless the whole file decodes, parses and validates.
pub fn ingest(conn: &mut Connection, bytes: &[u8]) -> Result<UpsertReport, FundError> {
    let candidates = parse_funds(bytes)?;
    let report = upsert_batch(conn, &candidates)?;

    info!(
        processed = report.processed(),
        created = report.created,
        updated = report.updated,
        "ingested fund upload"
    );

    Ok(report)
}

fn candidate_from_record(record: &StringRecord) -> Result<CandidateRecord, FundError> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();

    if record.len() != FIELD_NAMES.len() {
        warn!(line, fields = record.len(), "malformed row");
        return Err(FundError::MalformedRow {
            line,
            expected: FIELD_NAMES.len(),
            found: record.len(),
        });
    }

    Ok(CandidateRecord::new(&record[0], &record[1], &record[2], &record[3]).with_line(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_funds, list_funds, setup_database};
    use crate::error::ErrorKind;

    const UPLOAD: &[u8] = b"Name,Strategy,AUM (USD),Inception Date\nAmazing Fund 1,Long/Short Equity,355000000,2011-03-10\nAnother Fund Y,Global Macro,,";

    #[test]
    fn test_parse_skips_header_and_maps_positions() {
        let candidates = parse_funds(UPLOAD).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name.as_deref(), Some("Amazing Fund 1"));
        assert_eq!(candidates[0].strategy.as_deref(), Some("Long/Short Equity"));
        assert_eq!(candidates[0].aum.as_deref(), Some("355000000"));
        assert_eq!(candidates[0].inception_date.as_deref(), Some("2011-03-10"));
        assert_eq!(candidates[0].line, Some(2));
    }

    #[test]
    fn test_parse_normalizes_blank_fields() {
        let candidates = parse_funds(UPLOAD).unwrap();

        assert_eq!(candidates[1].name.as_deref(), Some("Another Fund Y"));
        assert_eq!(candidates[1].aum, None);
        assert_eq!(candidates[1].inception_date, None);
    }

    #[test]
    fn test_parse_ignores_header_content() {
        let candidates = parse_funds(b"whatever\nFund A,Arbitrage,1,\n").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name.as_deref(), Some("Fund A"));
    }

    #[test]
    fn test_parse_header_only_or_empty() {
        assert!(parse_funds(b"Name,Strategy,AUM (USD),Inception Date\n").unwrap().is_empty());
        assert!(parse_funds(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_quoted_fields_and_crlf() {
        let candidates =
            parse_funds(b"h1,h2,h3,h4\r\n\"Fund, With Comma\",Arbitrage,,\r\n").unwrap();
        assert_eq!(candidates[0].name.as_deref(), Some("Fund, With Comma"));
        assert_eq!(candidates[0].strategy.as_deref(), Some("Arbitrage"));
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let err = parse_funds(b"header\nFund A,Arbitrage,1\n").unwrap_err();

        assert!(matches!(
            err,
            FundError::MalformedRow { line: 2, expected: 4, found: 3 }
        ));
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn test_parse_rejects_long_row() {
        let err = parse_funds(b"header\nFund A,Arbitrage,1,,\n").unwrap_err();
        assert!(matches!(err, FundError::MalformedRow { found: 5, .. }));
    }

    #[test]
    fn test_parse_rejects_invalid_utf8() {
        let err = parse_funds(b"header\nFund \xff,Arbitrage,,\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn test_ingest_twice_keeps_two_records() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let first = ingest(&mut conn, UPLOAD).unwrap();
        assert_eq!(first.processed(), 2);
        assert_eq!(first.created, 2);
        assert_eq!(count_funds(&conn).unwrap(), 2);

        let second = ingest(&mut conn, UPLOAD).unwrap();
        assert_eq!(second.processed(), 2);
        assert_eq!(second.updated, 2);
        assert_eq!(count_funds(&conn).unwrap(), 2);
    }

    #[test]
    fn test_ingest_malformed_file_leaves_store_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        ingest(&mut conn, UPLOAD).unwrap();
        let before = list_funds(&conn, None).unwrap();

        let err = ingest(
            &mut conn,
            b"header\nAmazing Fund 1,Arbitrage,1,\nBroken Row\n",
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert_eq!(list_funds(&conn, None).unwrap(), before);
    }
}
