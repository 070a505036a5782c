use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;

use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::{
    LookbackWindow, PartitionPair, RateStatistic, Scheme, SchemeAStats, SchemeBStats,
};
use crate::store::query::{
    pairs_parameter, scheme_a_query, scheme_b_query, schema_sql, validate_table_name,
    window_cutoff,
};
use crate::store::RateStore;
use crate::utils::constants::{DEFAULT_SCHEME_A_TABLE, DEFAULT_SCHEME_B_TABLE};

/// Rate store backed by a SQLite database holding both provider tables
pub struct SqliteRateStore {
    conn: Connection,
    scheme_a_table: String,
    scheme_b_table: String,
    reference_date: Option<NaiveDate>,
    queries_issued: Cell<usize>,
}

impl SqliteRateStore {
    /// Open an existing database; missing provider tables are a startup error
    pub fn open<P: AsRef<Path>>(path: P, scheme_a_table: &str, scheme_b_table: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProcessingError::Config(format!(
                "rate database not found: {}",
                path.display()
            )));
        }

        let store = Self::from_connection(Connection::open(path)?, scheme_a_table, scheme_b_table)?;
        store.ensure_tables()?;
        Ok(store)
    }

    /// Fresh in-memory database with empty provider tables
    pub fn in_memory() -> Result<Self> {
        let store = Self::from_connection(
            Connection::open_in_memory()?,
            DEFAULT_SCHEME_A_TABLE,
            DEFAULT_SCHEME_B_TABLE,
        )?;
        store.create_schema()?;
        Ok(store)
    }

    fn from_connection(conn: Connection, scheme_a_table: &str, scheme_b_table: &str) -> Result<Self> {
        validate_table_name(scheme_a_table)?;
        validate_table_name(scheme_b_table)?;

        Ok(Self {
            conn,
            scheme_a_table: scheme_a_table.to_string(),
            scheme_b_table: scheme_b_table.to_string(),
            reference_date: None,
            queries_issued: Cell::new(0),
        })
    }

    /// Pin "today" for window cutoffs instead of the local date
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn create_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(&schema_sql(&self.scheme_a_table, &self.scheme_b_table)?)?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Aggregate queries executed since the store was opened
    pub fn queries_issued(&self) -> usize {
        self.queries_issued.get()
    }

    fn ensure_tables(&self) -> Result<()> {
        for table in [&self.scheme_a_table, &self.scheme_b_table] {
            let count: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )?;
            if count == 0 {
                return Err(ProcessingError::Config(format!(
                    "rate table '{}' does not exist",
                    table
                )));
            }
        }
        Ok(())
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn run_aggregate<T, F>(
        &self,
        scheme: Scheme,
        sql: &str,
        pairs: &[PartitionPair],
        window: LookbackWindow,
        decode: F,
    ) -> Result<HashMap<PartitionPair, T>>
    where
        F: Fn(&Row<'_>) -> rusqlite::Result<T>,
    {
        let cutoff = window_cutoff(self.today(), window);
        self.queries_issued.set(self.queries_issued.get() + 1);

        let to_store_error = |e: rusqlite::Error| ProcessingError::StoreQuery {
            scheme: scheme.to_string(),
            window: window.to_string(),
            message: e.to_string(),
        };

        let mut stmt = self.conn.prepare(sql).map_err(to_store_error)?;
        let rows = stmt
            .query_map(params![cutoff, pairs_parameter(pairs)], |row| {
                let pair = PartitionPair::new(row.get(0)?, row.get(1)?);
                Ok((pair, decode(row)?))
            })
            .map_err(to_store_error)?;

        let mut results = HashMap::new();
        for row in rows {
            let (pair, stats) = row.map_err(to_store_error)?;
            results.insert(pair, stats);
        }

        debug!(
            "{} {} query since {} returned {} rows",
            scheme,
            window,
            cutoff,
            results.len()
        );

        Ok(results)
    }
}

fn class_statistic(row: &Row<'_>, first_column: usize) -> rusqlite::Result<Option<RateStatistic>> {
    Ok(RateStatistic::from_columns(
        row.get(first_column)?,
        row.get(first_column + 1)?,
        row.get(first_column + 2)?,
    ))
}

fn days_column(row: &Row<'_>) -> rusqlite::Result<u32> {
    let days: Option<i64> = row.get(2)?;
    Ok(days.unwrap_or(0).max(0) as u32)
}

fn decode_scheme_a(row: &Row<'_>) -> rusqlite::Result<SchemeAStats> {
    let total_offers: Option<i64> = row.get(3)?;
    Ok(SchemeAStats {
        days_with_data: days_column(row)?,
        total_offers: total_offers.unwrap_or(0).max(0) as u64,
        trailer: class_statistic(row, 4)?,
        up_to_3_5t: class_statistic(row, 7)?,
        up_to_12t: class_statistic(row, 10)?,
    })
}

fn decode_scheme_b(row: &Row<'_>) -> rusqlite::Result<SchemeBStats> {
    Ok(SchemeBStats {
        days_with_data: days_column(row)?,
        lorry: class_statistic(row, 3)?,
        solo: class_statistic(row, 6)?,
        bus: class_statistic(row, 9)?,
        double_trailer: class_statistic(row, 12)?,
    })
}

impl RateStore for SqliteRateStore {
    fn query_scheme_a(
        &self,
        pairs: &[PartitionPair],
        window: LookbackWindow,
    ) -> Result<HashMap<PartitionPair, SchemeAStats>> {
        if pairs.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = scheme_a_query(&self.scheme_a_table)?;
        self.run_aggregate(Scheme::SchemeA, &sql, pairs, window, decode_scheme_a)
    }

    fn query_scheme_b(
        &self,
        pairs: &[PartitionPair],
        window: LookbackWindow,
    ) -> Result<HashMap<PartitionPair, SchemeBStats>> {
        if pairs.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = scheme_b_query(&self.scheme_b_table)?;
        self.run_aggregate(Scheme::SchemeB, &sql, pairs, window, decode_scheme_b)
    }
}
