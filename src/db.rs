// Fund Store - SQLite + WAL
// Uniqueness on name, (strategy, name) index, atomic batched upsert

use crate::entities::{
    CandidateRecord, Fund, FundValues, Strategy, DATE_FORMAT, MAX_AUM, MIN_AUM,
};
use crate::error::FundError;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// How long a writer waits for another writer's batch before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const FUND_COLUMNS: &str = "id, name, strategy, aum, inception_date";

/// Insert-or-update keyed on the business key; `id` is only written on insert
const UPSERT_SQL: &str = "INSERT INTO funds (id, name, strategy, aum, inception_date)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(name) DO UPDATE SET
         strategy = excluded.strategy,
         aum = excluded.aum,
         inception_date = excluded.inception_date";

/// Outcome of one `upsert_batch` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    pub created: usize,
    pub updated: usize,
}

impl UpsertReport {
    /// Rows applied (created + updated)
    pub fn processed(&self) -> usize {
        self.created + self.updated
    }
}

/// Open (or create) a database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection, FundError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    setup_database(&conn)?;
    debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<(), FundError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let strategies = Strategy::ALL
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS funds (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL UNIQUE CHECK (length(name) > 0),
                strategy TEXT NOT NULL CHECK (strategy IN ({})),
                aum INTEGER CHECK (aum BETWEEN {} AND {}),
                inception_date TEXT
            )",
            strategies, MIN_AUM, MAX_AUM
        ),
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_fund_strategy ON funds(strategy, name)",
        [],
    )?;

    Ok(())
}

/// Merge a batch of candidates into the store.
///
/// New names are inserted with a fresh UUID, existing names have their
/// strategy, aum and inception date replaced in place. Every candidate is
/// validated before anything is written, and the writes run in a single
/// `IMMEDIATE` transaction, so the batch applies completely or not at all and
/// concurrent batches are serialized on the write lock.
pub fn upsert_batch(
    conn: &mut Connection,
    records: &[CandidateRecord],
) -> Result<UpsertReport, FundError> {
    let values = records
        .iter()
        .map(CandidateRecord::validate)
        .collect::<Result<Vec<_>, _>>()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut report = UpsertReport::default();

    {
        let mut exists = tx.prepare("SELECT 1 FROM funds WHERE name = ?1")?;
        let mut upsert = tx.prepare(UPSERT_SQL)?;

        for fund in &values {
            let existed = exists.exists(params![fund.name])?;

            upsert.execute(params![
                Uuid::new_v4().to_string(),
                fund.name,
                fund.strategy,
                fund.aum,
                format_date(fund.inception_date),
            ])?;

            if existed {
                report.updated += 1;
            } else {
                report.created += 1;
            }
        }
    }

    tx.commit()?;

    info!(
        created = report.created,
        updated = report.updated,
        "upserted fund batch"
    );

    Ok(report)
}

/// Insert a single fund entered interactively.
///
/// Unlike `upsert_batch`, an existing name is an error, not an update.
pub fn create_fund(conn: &Connection, values: &FundValues) -> Result<Fund, FundError> {
    let fund = Fund {
        id: Uuid::new_v4(),
        name: values.name.clone(),
        strategy: values.strategy,
        aum: values.aum,
        inception_date: values.inception_date,
    };

    let result = conn.execute(
        "INSERT INTO funds (id, name, strategy, aum, inception_date) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            fund.id.to_string(),
            fund.name,
            fund.strategy,
            fund.aum,
            format_date(fund.inception_date),
        ],
    );

    match result {
        Ok(_) => {
            info!(id = %fund.id, name = %fund.name, "created fund");
            Ok(fund)
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(FundError::DuplicateName(fund.name))
        }
        Err(e) => Err(e.into()),
    }
}

/// Funds ordered by name, optionally restricted to one strategy
pub fn list_funds(conn: &Connection, strategy: Option<Strategy>) -> Result<Vec<Fund>, FundError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM funds
         WHERE (?1 IS NULL OR strategy = ?1)
         ORDER BY name ASC",
        FUND_COLUMNS
    ))?;

    let funds = stmt
        .query_map(params![strategy], fund_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(funds)
}

pub fn get_fund(conn: &Connection, id: Uuid) -> Result<Fund, FundError> {
    conn.query_row(
        &format!("SELECT {} FROM funds WHERE id = ?1", FUND_COLUMNS),
        params![id.to_string()],
        fund_from_row,
    )
    .optional()?
    .ok_or(FundError::NotFound(id))
}

/// Total AUM over the filtered set, ignoring nulls.
///
/// `None` when no fund matches or none of the matches reports an AUM.
pub fn sum_aum(conn: &Connection, strategy: Option<Strategy>) -> Result<Option<i64>, FundError> {
    let total: Option<i64> = conn.query_row(
        "SELECT SUM(aum) FROM funds WHERE (?1 IS NULL OR strategy = ?1)",
        params![strategy],
        |row| row.get(0),
    )?;

    Ok(total)
}

pub fn count_funds(conn: &Connection) -> Result<i64, FundError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM funds", [], |row| row.get(0))?;

    Ok(count)
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn fund_from_row(row: &Row<'_>) -> rusqlite::Result<Fund> {
    let id: String = row.get(0)?;
    let inception_date: Option<String> = row.get(4)?;

    Ok(Fund {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        name: row.get(1)?,
        strategy: row.get(2)?,
        aum: row.get(3)?,
        inception_date: inception_date
            .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn candidate(name: &str, strategy: &str, aum: &str, date: &str) -> CandidateRecord {
        CandidateRecord::new(name, strategy, aum, date)
    }

    fn find<'a>(funds: &'a [Fund], name: &str) -> &'a Fund {
        funds.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn test_upsert_inserts_new_funds() {
        let mut conn = test_db();

        let report = upsert_batch(
            &mut conn,
            &[
                candidate("Amazing Fund 1", "Long/Short Equity", "355000000", "2011-03-10"),
                candidate("Another Fund Y", "Global Macro", "", ""),
            ],
        )
        .unwrap();

        assert_eq!(report, UpsertReport { created: 2, updated: 0 });
        assert_eq!(report.processed(), 2);
        assert_eq!(count_funds(&conn).unwrap(), 2);

        let funds = list_funds(&conn, None).unwrap();
        let another = find(&funds, "Another Fund Y");
        assert_eq!(another.aum, None);
        assert_eq!(another.inception_date, None);
    }

    #[test]
    fn test_upsert_updates_in_place_and_keeps_id() {
        let mut conn = test_db();

        upsert_batch(
            &mut conn,
            &[candidate("Amazing Fund 1", "Long/Short Equity", "355000000", "2011-03-10")],
        )
        .unwrap();
        let original = list_funds(&conn, None).unwrap().remove(0);

        let report = upsert_batch(
            &mut conn,
            &[candidate("Amazing Fund 1", "Arbitrage", "", "2015-01-01")],
        )
        .unwrap();
        assert_eq!(report, UpsertReport { created: 0, updated: 1 });

        let updated = get_fund(&conn, original.id).unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.strategy, Strategy::Arbitrage);
        assert_eq!(updated.aum, None);
        assert_eq!(
            updated.inception_date,
            Some(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap())
        );
        assert_eq!(count_funds(&conn).unwrap(), 1);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut conn = test_db();
        let batch = vec![
            candidate("Amazing Fund 1", "Long/Short Equity", "355000000", "2011-03-10"),
            candidate("Another Fund Y", "Global Macro", "", ""),
        ];

        upsert_batch(&mut conn, &batch).unwrap();
        let first = list_funds(&conn, None).unwrap();

        for _ in 0..3 {
            upsert_batch(&mut conn, &batch).unwrap();
        }
        let again = list_funds(&conn, None).unwrap();

        assert_eq!(first, again);
        assert_eq!(count_funds(&conn).unwrap(), 2);
    }

    #[test]
    fn test_upsert_is_atomic_on_validation_failure() {
        let mut conn = test_db();
        upsert_batch(
            &mut conn,
            &[candidate("Amazing Fund 1", "Long/Short Equity", "355000000", "2011-03-10")],
        )
        .unwrap();
        let before = list_funds(&conn, None).unwrap();

        let err = upsert_batch(
            &mut conn,
            &[
                candidate("Amazing Fund 1", "Global Macro", "1", ""),
                candidate("New Fund", "Arbitrage", "", ""),
                candidate("Broken Fund", "Venture Capital", "", ""),
            ],
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(list_funds(&conn, None).unwrap(), before);
    }

    #[test]
    fn test_upsert_rejects_empty_name() {
        let mut conn = test_db();

        let err = upsert_batch(&mut conn, &[candidate("", "Arbitrage", "", "")]).unwrap_err();

        assert!(matches!(err, FundError::Validation(ref v) if v.field == "name"));
        assert_eq!(count_funds(&conn).unwrap(), 0);
    }

    #[test]
    fn test_upsert_duplicate_name_in_batch_last_wins() {
        let mut conn = test_db();

        let report = upsert_batch(
            &mut conn,
            &[
                candidate("Fund A", "Arbitrage", "10", ""),
                candidate("Fund A", "Global Macro", "20", ""),
            ],
        )
        .unwrap();

        assert_eq!(report, UpsertReport { created: 1, updated: 1 });
        let funds = list_funds(&conn, None).unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].strategy, Strategy::GlobalMacro);
        assert_eq!(funds[0].aum, Some(20));
    }

    #[test]
    fn test_upsert_empty_batch() {
        let mut conn = test_db();
        let report = upsert_batch(&mut conn, &[]).unwrap();
        assert_eq!(report.processed(), 0);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut conn = test_db();

        upsert_batch(
            &mut conn,
            &[
                candidate("Fund A", "Arbitrage", "", ""),
                candidate("FUND A", "Arbitrage", "", ""),
            ],
        )
        .unwrap();

        assert_eq!(count_funds(&conn).unwrap(), 2);
    }

    #[test]
    fn test_list_filters_and_orders_by_name() {
        let mut conn = test_db();
        upsert_batch(
            &mut conn,
            &[
                candidate("Zeta Macro", "Global Macro", "5", ""),
                candidate("Amazing Fund 1", "Long/Short Equity", "355000000", "2011-03-10"),
                candidate("Alpha Macro", "Global Macro", "", ""),
            ],
        )
        .unwrap();

        let macro_funds = list_funds(&conn, Some(Strategy::GlobalMacro)).unwrap();
        let names: Vec<_> = macro_funds.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha Macro", "Zeta Macro"]);
        assert!(macro_funds.iter().all(|f| f.strategy == Strategy::GlobalMacro));

        let all = list_funds(&conn, None).unwrap();
        let names: Vec<_> = all.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha Macro", "Amazing Fund 1", "Zeta Macro"]);

        assert!(list_funds(&conn, Some(Strategy::Arbitrage)).unwrap().is_empty());
    }

    #[test]
    fn test_sum_aum() {
        let mut conn = test_db();
        assert_eq!(sum_aum(&conn, None).unwrap(), None);

        upsert_batch(
            &mut conn,
            &[
                candidate("A", "Global Macro", "100", ""),
                candidate("B", "Global Macro", "", ""),
                candidate("C", "Long/Short Equity", "50", ""),
                candidate("D", "Arbitrage", "", ""),
            ],
        )
        .unwrap();

        assert_eq!(sum_aum(&conn, None).unwrap(), Some(150));
        assert_eq!(sum_aum(&conn, Some(Strategy::GlobalMacro)).unwrap(), Some(100));
        // Only null values in the filtered set
        assert_eq!(sum_aum(&conn, Some(Strategy::Arbitrage)).unwrap(), None);
    }

    #[test]
    fn test_sum_aum_at_range_limits() {
        let mut conn = test_db();

        upsert_batch(
            &mut conn,
            &[
                candidate("A", "Arbitrage", "2147483647", ""),
                candidate("B", "Arbitrage", "2147483647", ""),
                candidate("C", "Global Macro", "-2147483648", ""),
            ],
        )
        .unwrap();

        assert_eq!(
            sum_aum(&conn, Some(Strategy::Arbitrage)).unwrap(),
            Some(2 * MAX_AUM)
        );
        assert_eq!(sum_aum(&conn, None).unwrap(), Some(2 * MAX_AUM + MIN_AUM));
    }

    #[test]
    fn test_upsert_rejects_aum_out_of_range() {
        let mut conn = test_db();

        let err = upsert_batch(
            &mut conn,
            &[
                candidate("A", "Arbitrage", "9223372036854775807", "").with_line(2),
                candidate("B", "Arbitrage", "9223372036854775807", "").with_line(3),
            ],
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(count_funds(&conn).unwrap(), 0);
        assert_eq!(sum_aum(&conn, None).unwrap(), None);
    }

    #[test]
    fn test_schema_rejects_aum_out_of_range() {
        let conn = test_db();
        let values = FundValues {
            name: "Huge Fund".to_string(),
            strategy: Strategy::GlobalMacro,
            aum: Some(MAX_AUM + 1),
            inception_date: None,
        };

        let err = create_fund(&conn, &values).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(count_funds(&conn).unwrap(), 0);
    }

    #[test]
    fn test_get_fund_not_found() {
        let conn = test_db();
        let id = Uuid::new_v4();

        let err = get_fund(&conn, id).unwrap_err();
        assert!(matches!(err, FundError::NotFound(missing) if missing == id));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_create_fund_rejects_duplicate_name() {
        let conn = test_db();
        let values = candidate("Pretty Good Fund X", "Global Macro", "", "2012-04-10")
            .validate()
            .unwrap();

        let created = create_fund(&conn, &values).unwrap();
        assert_eq!(get_fund(&conn, created.id).unwrap(), created);

        let err = create_fund(&conn, &values).unwrap_err();
        assert!(matches!(err, FundError::DuplicateName(ref name) if name == "Pretty Good Fund X"));
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(count_funds(&conn).unwrap(), 1);
    }

    #[test]
    fn test_schema_rejects_unknown_strategy() {
        let conn = test_db();

        let result = conn.execute(
            "INSERT INTO funds (id, name, strategy) VALUES (?1, 'Raw Fund', 'Venture')",
            params![Uuid::new_v4().to_string()],
        );

        assert!(result.is_err());
    }
}
