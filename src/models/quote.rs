use serde::{Deserialize, Serialize};

use crate::models::partition::Scheme;
use crate::models::rates::{
    LookbackWindow, RateStatistic, SchemeAStats, SchemeBStats, SchemeStatistics, VehicleClass,
};

/// Which providers contributed data to a window quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Both,
    SchemeAOnly,
    SchemeBOnly,
    None,
}

impl DataSource {
    pub fn from_flags(scheme_a_has_data: bool, scheme_b_has_data: bool) -> Self {
        match (scheme_a_has_data, scheme_b_has_data) {
            (true, true) => DataSource::Both,
            (true, false) => DataSource::SchemeAOnly,
            (false, true) => DataSource::SchemeBOnly,
            (false, false) => DataSource::None,
        }
    }
}

/// Aggregated result for one route and one lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowQuote {
    pub window: LookbackWindow,
    pub scheme_a: SchemeAStats,
    pub scheme_b: SchemeBStats,
    pub scheme_a_has_data: bool,
    pub scheme_b_has_data: bool,
    pub has_data: bool,
    pub data_source: DataSource,
    pub scheme_a_rate_per_km: Option<f64>,
    pub scheme_b_rate_per_km: Option<f64>,
    /// Unweighted mean of the per-scheme rates that have data
    pub average_rate_per_km: Option<f64>,
    pub estimated_total_price: Option<f64>,
    pub scheme_a_offers_per_day: Option<f64>,
    /// Schemes whose batch query failed, so "no data" is not authoritative
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<Scheme>,
}

impl WindowQuote {
    /// Per-class statistic from whichever scheme prices `class`
    pub fn statistic(&self, class: VehicleClass) -> Option<RateStatistic> {
        match class.scheme() {
            Scheme::SchemeA => self.scheme_a.statistic(class),
            Scheme::SchemeB => self.scheme_b.statistic(class),
        }
    }
}

/// All window quotes for a route, in window order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteQuote {
    pub windows: Vec<WindowQuote>,
}

impl RouteQuote {
    pub fn window(&self, window: LookbackWindow) -> Option<&WindowQuote> {
        self.windows.iter().find(|q| q.window == window)
    }

    pub fn has_any_data(&self) -> bool {
        self.windows.iter().any(|q| q.has_data)
    }
}
