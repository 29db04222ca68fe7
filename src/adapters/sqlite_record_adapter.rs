//! SQLite export of book history.
//!
//! Each run is stored in its own table named by the backtest key. Writing
//! replaces any earlier table of the same name.

use crate::adapters::csv_record_adapter::RecordRow;
use crate::domain::error::LedgerError;
use crate::domain::event::Record;
use crate::ports::record_port::RecordSink;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

pub struct SqliteRecordSink {
    pool: Pool<SqliteConnectionManager>,
    table: String,
}

fn pool_error(e: r2d2::Error) -> LedgerError {
    LedgerError::Export {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> LedgerError {
    LedgerError::Export {
        reason: e.to_string(),
    }
}

/// SQLite integers are signed; values above `i64::MAX` are refused.
fn to_sql_int(value: Option<u64>, column: &str) -> Result<Option<i64>, LedgerError> {
    value
        .map(|v| {
            i64::try_from(v).map_err(|_| LedgerError::Export {
                reason: format!("{column} {v} does not fit in a sqlite integer"),
            })
        })
        .transpose()
}

impl SqliteRecordSink {
    /// `table` must already be a plain identifier; the config layer checks
    /// `backtest_key` before it gets here.
    pub fn open(path: &Path, table: &str) -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_error)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn in_memory(table: &str) -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_error)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    fn reset_table(&self, conn: &rusqlite::Connection) -> Result<(), LedgerError> {
        let t = &self.table;
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS \"{t}\";
            CREATE TABLE \"{t}\" (
                seq INTEGER PRIMARY KEY,
                strategy_name TEXT NOT NULL,
                type TEXT NOT NULL,
                order_index INTEGER,
                instrument TEXT NOT NULL,
                tradingday TEXT NOT NULL,
                datetime TEXT NOT NULL,
                signal TEXT,
                action TEXT,
                direction TEXT,
                quantity INTEGER,
                order_kind TEXT,
                price REAL
            );
            CREATE INDEX \"idx_{t}_lookup\" ON \"{t}\"(strategy_name, type, tradingday, datetime);"
        ))
        .map_err(query_error)
    }

    /// Number of stored records for `strategy_name` of the given `type`.
    pub fn count(&self, strategy_name: &str, kind: &str) -> Result<i64, LedgerError> {
        let conn = self.pool.get().map_err(pool_error)?;
        conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM \"{}\" WHERE strategy_name = ?1 AND type = ?2",
                self.table
            ),
            params![strategy_name, kind],
            |row| row.get(0),
        )
        .map_err(query_error)
    }
}

impl RecordSink for SqliteRecordSink {
    fn write_records(&mut self, records: &[Record]) -> Result<usize, LedgerError> {
        let mut conn = self.pool.get().map_err(pool_error)?;

        // the old table survives until the new rows commit
        let tx = conn.transaction().map_err(query_error)?;
        self.reset_table(&tx)?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO \"{}\" (strategy_name, type, order_index, instrument, tradingday,
                     datetime, signal, action, direction, quantity, order_kind, price)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    self.table
                ))
                .map_err(query_error)?;
            for record in records {
                let row = RecordRow::from_record(record);
                let index = to_sql_int(row.index, "index")?;
                let quantity = to_sql_int(row.quantity, "quantity")?;
                stmt.execute(params![
                    row.strategy_name,
                    row.kind,
                    index,
                    row.instrument,
                    row.tradingday,
                    row.datetime,
                    row.signal,
                    row.action,
                    row.direction,
                    quantity,
                    row.order_kind,
                    row.price
                ])
                .map_err(query_error)?;
            }
        }
        tx.commit().map_err(query_error)?;

        Ok(records.len())
    }
}
