use std::path::Path;

use crate::error::Result;
use crate::models::{
    PartitionPair, RateStatistic, RouteResult, RouteStatus, Scheme, VehicleClass, WindowQuote,
};
use crate::utils::constants::LOOKBACK_WINDOWS;

/// Flattens route results into one spreadsheet row per route
pub struct CsvExporter {
    delimiter: u8,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self { delimiter: b';' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn headers() -> Vec<String> {
        let mut headers = vec![
            "Route".to_string(),
            "Status".to_string(),
            "Mapping Scheme A".to_string(),
            "Mapping Scheme B".to_string(),
            "Distance [km]".to_string(),
            "Distance method".to_string(),
        ];
        for window in LOOKBACK_WINDOWS {
            headers.push(format!("Scheme A {} [EUR/km]", window));
        }
        for window in LOOKBACK_WINDOWS {
            headers.push(format!("Scheme A {} offers", window));
        }
        for window in LOOKBACK_WINDOWS {
            headers.push(format!("Scheme B {} [EUR/km]", window));
        }
        for window in LOOKBACK_WINDOWS {
            headers.push(format!("Average {} [EUR/km]", window));
        }
        for class in exported_classes() {
            let prefix = format!("{} {}", class.scheme(), class);
            for window in LOOKBACK_WINDOWS {
                headers.push(format!("{} avg {} [EUR/km]", prefix, window));
            }
            for window in LOOKBACK_WINDOWS {
                headers.push(format!("{} median {} [EUR/km]", prefix, window));
            }
            for window in LOOKBACK_WINDOWS {
                headers.push(format!("{} {} {}", prefix, count_label(class), window));
            }
        }
        headers.push("Notes".to_string());
        headers
    }

    pub fn export(&self, results: &[RouteResult], path: &Path) -> Result<usize> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        writer.write_record(Self::headers())?;
        for result in results {
            writer.write_record(Self::row(result))?;
        }
        writer.flush()?;

        Ok(results.len())
    }

    fn row(result: &RouteResult) -> Vec<String> {
        let mapping = result.regions.as_ref().and_then(|r| r.complete());
        let pair = |pair: Option<PartitionPair>| {
            pair.map(|p| format!("{}-{}", p.start, p.end))
                .unwrap_or_default()
        };

        let mut row = vec![
            result.route.clone(),
            status_label(result.status).to_string(),
            pair(mapping.map(|m| m.scheme_a)),
            pair(mapping.map(|m| m.scheme_b)),
            optional_number(result.distance_km),
            result.distance_method.label().to_string(),
        ];

        let windows: Vec<Option<&WindowQuote>> = LOOKBACK_WINDOWS
            .iter()
            .map(|w| result.quote.as_ref().and_then(|q| q.window(*w)))
            .collect();

        for quote in &windows {
            row.push(optional_number(quote.and_then(|q| q.scheme_a_rate_per_km)));
        }
        for quote in &windows {
            let offers = quote
                .filter(|q| q.scheme_a_has_data)
                .map(|q| q.scheme_a.total_offers.to_string());
            row.push(offers.unwrap_or_default());
        }
        for quote in &windows {
            row.push(optional_number(quote.and_then(|q| q.scheme_b_rate_per_km)));
        }
        for quote in &windows {
            row.push(optional_number(quote.and_then(|q| q.average_rate_per_km)));
        }

        for class in exported_classes() {
            let stats: Vec<Option<RateStatistic>> = windows
                .iter()
                .map(|quote| quote.and_then(|q| q.statistic(class)))
                .collect();
            row.extend(stats.iter().map(|s| optional_number(s.map(|s| s.average))));
            row.extend(stats.iter().map(|s| optional_number(s.and_then(|s| s.median))));
            row.extend(
                stats
                    .iter()
                    .map(|s| s.map(|s| s.sample_count.to_string()).unwrap_or_default()),
            );
        }

        row.push(notes(result));
        row
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn exported_classes() -> impl Iterator<Item = VehicleClass> {
    VehicleClass::SCHEME_A
        .into_iter()
        .chain(VehicleClass::SCHEME_B)
}

/// Scheme A counts offers, Scheme B counts qualifying records
fn count_label(class: VehicleClass) -> &'static str {
    match class.scheme() {
        Scheme::SchemeA => "offers",
        Scheme::SchemeB => "records",
    }
}

fn status_label(status: RouteStatus) -> &'static str {
    match status {
        RouteStatus::Success => "success",
        RouteStatus::MappingFailed => "mapping_failed",
        RouteStatus::TooShort => "too_short",
        RouteStatus::Error => "error",
    }
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn notes(result: &RouteResult) -> String {
    match result.status {
        RouteStatus::TooShort => "route too short".to_string(),
        RouteStatus::MappingFailed => result
            .reason
            .clone()
            .unwrap_or_else(|| "mapping failed".to_string()),
        RouteStatus::Error => format!(
            "error: {}",
            result.error.as_deref().unwrap_or("unknown")
        ),
        RouteStatus::Success => {
            let has_data = result.quote.as_ref().map_or(false, |q| q.has_any_data());
            if has_data {
                String::new()
            } else {
                "no historical data".to_string()
            }
        }
    }
}
