use crate::models::LookbackWindow;

/// Earth radius used by the spherical great-circle approximation
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Routes shorter than this never appear in the historical store
pub const MIN_DISTANCE_KM: f64 = 150.0;

/// Candidates in the same country get their distance multiplied by this factor
pub const SAME_COUNTRY_DISTANCE_FACTOR: f64 = 0.5;

/// Lookback windows queried for every route, in output order
pub const LOOKBACK_WINDOWS: [LookbackWindow; 3] = [
    LookbackWindow::Week,
    LookbackWindow::Month,
    LookbackWindow::Quarter,
];

/// Postal key specificities emitted by the postal table builder
pub const POSTAL_PREFIX_LENGTHS: [usize; 3] = [2, 3, 4];

/// Processing defaults
pub const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_PROGRESS_EVERY_ROUTES: usize = 100;
pub const DEFAULT_ROUTING_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ROUTING_DELAY_MS: u64 = 200;

/// Store defaults
pub const DEFAULT_SCHEME_A_TABLE: &str = "scheme_a_offers";
pub const DEFAULT_SCHEME_B_TABLE: &str = "scheme_b_offers";

/// Decimal places kept on aggregated store averages
pub const STORE_ROUNDING_DIGITS: i32 = 4;

/// Routing request flags
pub const TRAVEL_MODE_TRUCK: &str = "Truck";
pub const OPTIMIZE_FASTEST_ROUTE: &str = "FastestRoute";

/// File names
pub const CONFIG_FILE: &str = "freight-rate-checker.toml";
pub const CHECKPOINT_SUFFIX: &str = "_checkpoint";
pub const RESULTS_FILE_PREFIX: &str = "route_analysis";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const ROUTE_CSV_COLUMN: &str = "Lane Name";
