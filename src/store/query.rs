use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::error::{ProcessingError, Result};
use crate::models::{LookbackWindow, PartitionPair};
use crate::utils::constants::STORE_ROUNDING_DIGITS;

/// Scheme A price column prefixes
pub const SCHEME_A_CLASSES: [&str; 3] = ["trailer", "vehicle_up_to_3_5_t", "vehicle_up_to_12_t"];

/// Scheme B price column prefixes
pub const SCHEME_B_CLASSES: [&str; 4] = ["lorry", "solo", "bus", "double_trailer"];

/// Table names are interpolated into SQL, so only plain identifiers pass
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ProcessingError::Config(format!(
            "'{}' is not a valid table name",
            name
        )));
    }
    Ok(())
}

/// First enlistment date inside the window
pub fn window_cutoff(today: NaiveDate, window: LookbackWindow) -> String {
    (today - Duration::days(window.days()))
        .format("%Y-%m-%d")
        .to_string()
}

/// Row-value membership test against the pair list bound as `?2`
///
/// The pairs travel as one JSON array so the statement size and parameter
/// count stay fixed however many pairs a batch holds.
pub const PAIR_FILTER: &str = "(starting_id, destination_id) IN \
     (SELECT json_extract(value, '$[0]'), json_extract(value, '$[1]') FROM json_each(?2))";

/// `[[start, end], ...]`, the `?2` parameter of the batched queries
pub fn pairs_parameter(pairs: &[PartitionPair]) -> String {
    let rows: Vec<Value> = pairs
        .iter()
        .map(|pair| Value::from(vec![pair.start, pair.end]))
        .collect();
    Value::from(rows).to_string()
}

fn avg_column(column: &str) -> String {
    format!("ROUND(AVG({}), {})", column, STORE_ROUNDING_DIGITS)
}

fn having_any_average(classes: &[&str]) -> String {
    classes
        .iter()
        .map(|class| format!("AVG({}_avg_price_per_km) IS NOT NULL", class))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Batched Scheme A aggregate
///
/// Columns: starting_id, destination_id, num_days, total_offers, then per class
/// average, median and the offers of rows that priced that class.
pub fn scheme_a_query(table: &str) -> Result<String> {
    validate_table_name(table)?;

    let mut columns = vec![
        "starting_id".to_string(),
        "destination_id".to_string(),
        "COUNT(DISTINCT enlistment_date) AS num_days".to_string(),
        "SUM(number_of_offers_total) AS total_offers".to_string(),
    ];
    for class in SCHEME_A_CLASSES {
        columns.push(avg_column(&format!("{}_avg_price_per_km", class)));
        columns.push(avg_column(&format!("{}_median_price_per_km", class)));
        columns.push(format!(
            "SUM(CASE WHEN {}_avg_price_per_km IS NOT NULL THEN number_of_offers_total END)",
            class
        ));
    }

    Ok(aggregate_query(table, &columns, &SCHEME_A_CLASSES))
}

/// Batched Scheme B aggregate
///
/// Same leading columns as Scheme A minus total_offers; the per-class count
/// is the number of rows that priced the class.
pub fn scheme_b_query(table: &str) -> Result<String> {
    validate_table_name(table)?;

    let mut columns = vec![
        "starting_id".to_string(),
        "destination_id".to_string(),
        "COUNT(DISTINCT enlistment_date) AS num_days".to_string(),
    ];
    for class in SCHEME_B_CLASSES {
        columns.push(avg_column(&format!("{}_avg_price_per_km", class)));
        columns.push(avg_column(&format!("{}_median_price_per_km", class)));
        columns.push(format!(
            "COUNT(CASE WHEN {}_avg_price_per_km IS NOT NULL THEN 1 END)",
            class
        ));
    }

    Ok(aggregate_query(table, &columns, &SCHEME_B_CLASSES))
}

fn aggregate_query(table: &str, columns: &[String], classes: &[&str]) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} AND enlistment_date >= ?1 \
         GROUP BY starting_id, destination_id HAVING {}",
        columns.join(", "),
        table,
        PAIR_FILTER,
        having_any_average(classes)
    )
}

/// DDL for both provider tables, used by tests and local fixtures
pub fn schema_sql(scheme_a_table: &str, scheme_b_table: &str) -> Result<String> {
    validate_table_name(scheme_a_table)?;
    validate_table_name(scheme_b_table)?;

    Ok(format!(
        "{}\n{}",
        table_ddl(scheme_a_table, &SCHEME_A_CLASSES, "number_of_offers_total"),
        table_ddl(scheme_b_table, &SCHEME_B_CLASSES, "number_of_records")
    ))
}

fn table_ddl(table: &str, classes: &[&str], count_column: &str) -> String {
    let mut columns = vec![
        "starting_id INTEGER NOT NULL".to_string(),
        "destination_id INTEGER NOT NULL".to_string(),
        "enlistment_date TEXT NOT NULL".to_string(),
    ];
    for class in classes {
        columns.push(format!("{}_avg_price_per_km REAL", class));
        columns.push(format!("{}_median_price_per_km REAL", class));
    }
    columns.push(format!("{} INTEGER", count_column));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        table,
        columns.join(",\n    ")
    )
}
