use crate::models::{
    DataSource, LookbackWindow, PartitionMapping, RouteDistance, RouteQuote, Scheme,
    SchemeAStats, SchemeBStats, SchemeStatistics, WindowQuote,
};
use crate::store::{BatchStatistics, StatsLookup};
use crate::utils::constants::LOOKBACK_WINDOWS;
use crate::utils::coordinates::round_to;

/// Assembles per-window quotes from cached batch statistics
pub struct QuoteAggregator {
    windows: Vec<LookbackWindow>,
}

impl QuoteAggregator {
    pub fn new() -> Self {
        Self {
            windows: LOOKBACK_WINDOWS.to_vec(),
        }
    }

    pub fn with_windows(mut self, windows: &[LookbackWindow]) -> Self {
        self.windows = windows.to_vec();
        self
    }

    pub fn windows(&self) -> &[LookbackWindow] {
        &self.windows
    }

    pub fn aggregate(
        &self,
        mapping: &PartitionMapping,
        distance: Option<RouteDistance>,
        stats: &BatchStatistics,
    ) -> RouteQuote {
        let distance_km = distance.map(|d| d.km);

        let windows = self
            .windows
            .iter()
            .map(|&window| {
                window_quote(
                    window,
                    stats.scheme_a(window, &mapping.scheme_a),
                    stats.scheme_b(window, &mapping.scheme_b),
                    distance_km,
                )
            })
            .collect();

        RouteQuote { windows }
    }
}

impl Default for QuoteAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// One window's quote
///
/// The overall rate is the plain mean of the per-scheme headline rates that
/// have data. It is not weighted by sample counts.
pub fn window_quote(
    window: LookbackWindow,
    scheme_a: StatsLookup<'_, SchemeAStats>,
    scheme_b: StatsLookup<'_, SchemeBStats>,
    distance_km: Option<f64>,
) -> WindowQuote {
    let mut unavailable = Vec::new();
    if scheme_a.is_query_failed() {
        unavailable.push(Scheme::SchemeA);
    }
    if scheme_b.is_query_failed() {
        unavailable.push(Scheme::SchemeB);
    }

    let scheme_a = scheme_a.found().cloned().unwrap_or_default();
    let scheme_b = scheme_b.found().cloned().unwrap_or_default();

    let scheme_a_rate = scheme_a.headline_rate();
    let scheme_b_rate = scheme_b.headline_rate();
    let scheme_a_has_data = scheme_a_rate.is_some();
    let scheme_b_has_data = scheme_b_rate.is_some();

    let rates: Vec<f64> = [scheme_a_rate, scheme_b_rate].into_iter().flatten().collect();
    let average = if rates.is_empty() {
        None
    } else {
        Some(round_to(rates.iter().sum::<f64>() / rates.len() as f64, 2))
    };

    let estimated_total_price = match (average, distance_km) {
        (Some(rate), Some(km)) => Some(round_to(rate * km, 2)),
        _ => None,
    };

    WindowQuote {
        window,
        scheme_a_offers_per_day: scheme_a.offers_per_day().map(|v| round_to(v, 2)),
        scheme_a,
        scheme_b,
        scheme_a_has_data,
        scheme_b_has_data,
        has_data: scheme_a_has_data || scheme_b_has_data,
        data_source: DataSource::from_flags(scheme_a_has_data, scheme_b_has_data),
        scheme_a_rate_per_km: scheme_a_rate,
        scheme_b_rate_per_km: scheme_b_rate,
        average_rate_per_km: average,
        estimated_total_price,
        unavailable,
    }
}
