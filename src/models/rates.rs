use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::partition::Scheme;

/// Historical lookback period for rate statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LookbackWindow {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl LookbackWindow {
    pub fn days(&self) -> i64 {
        match self {
            LookbackWindow::Week => 7,
            LookbackWindow::Month => 30,
            LookbackWindow::Quarter => 90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LookbackWindow::Week => "7d",
            LookbackWindow::Month => "30d",
            LookbackWindow::Quarter => "90d",
        }
    }

    pub fn from_days(days: i64) -> Option<Self> {
        match days {
            7 => Some(LookbackWindow::Week),
            30 => Some(LookbackWindow::Month),
            90 => Some(LookbackWindow::Quarter),
            _ => None,
        }
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Truck/trailer configurations priced by the exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    // Scheme A
    Trailer,
    #[serde(rename = "up_to_3_5t")]
    UpTo3_5t,
    #[serde(rename = "up_to_12t")]
    UpTo12t,
    // Scheme B
    Lorry,
    Solo,
    Bus,
    DoubleTrailer,
}

impl VehicleClass {
    /// Scheme A classes in column order
    pub const SCHEME_A: [VehicleClass; 3] = [
        VehicleClass::Trailer,
        VehicleClass::UpTo3_5t,
        VehicleClass::UpTo12t,
    ];

    /// Scheme B classes in column order
    pub const SCHEME_B: [VehicleClass; 4] = [
        VehicleClass::Lorry,
        VehicleClass::Solo,
        VehicleClass::Bus,
        VehicleClass::DoubleTrailer,
    ];

    pub fn scheme(&self) -> Scheme {
        match self {
            VehicleClass::Trailer | VehicleClass::UpTo3_5t | VehicleClass::UpTo12t => {
                Scheme::SchemeA
            }
            VehicleClass::Lorry
            | VehicleClass::Solo
            | VehicleClass::Bus
            | VehicleClass::DoubleTrailer => Scheme::SchemeB,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VehicleClass::Trailer => "Trailer",
            VehicleClass::UpTo3_5t => "Up to 3.5t",
            VehicleClass::UpTo12t => "Up to 12t",
            VehicleClass::Lorry => "Lorry",
            VehicleClass::Solo => "Solo",
            VehicleClass::Bus => "Bus",
            VehicleClass::DoubleTrailer => "Double trailer",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Aggregated price per km for one partition pair, vehicle class and window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateStatistic {
    pub average: f64,
    pub median: Option<f64>,
    /// Offers for Scheme A, qualifying rows for Scheme B
    pub sample_count: u64,
}

impl RateStatistic {
    pub fn new(average: f64, median: Option<f64>, sample_count: u64) -> Self {
        Self {
            average,
            median,
            sample_count,
        }
    }

    /// Decode nullable aggregate columns; a missing or zero average means no data
    pub fn from_columns(
        average: Option<f64>,
        median: Option<f64>,
        sample_count: Option<i64>,
    ) -> Option<Self> {
        let average = average.filter(|avg| *avg != 0.0)?;
        Some(Self {
            average,
            median: median.filter(|m| *m != 0.0),
            sample_count: sample_count.unwrap_or(0).max(0) as u64,
        })
    }
}

/// Per-provider statistics shape shared by both schemes
pub trait SchemeStatistics {
    fn scheme(&self) -> Scheme;

    /// Vehicle classes with data, in headline priority order
    fn classes(&self) -> Vec<(VehicleClass, RateStatistic)>;

    /// Statistic for one class; `None` for classes of the other scheme
    fn statistic(&self, class: VehicleClass) -> Option<RateStatistic>;

    fn days_with_data(&self) -> u32;

    fn has_data(&self) -> bool {
        !self.classes().is_empty()
    }

    /// The provider's representative rate: first class with data in priority order
    fn headline_rate(&self) -> Option<f64> {
        self.classes().first().map(|(_, stat)| stat.average)
    }
}

/// Scheme A: three vehicle classes, sample counts are offer counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeAStats {
    pub days_with_data: u32,
    pub total_offers: u64,
    pub trailer: Option<RateStatistic>,
    pub up_to_3_5t: Option<RateStatistic>,
    pub up_to_12t: Option<RateStatistic>,
}

impl SchemeAStats {
    pub fn offers_per_day(&self) -> Option<f64> {
        if self.days_with_data == 0 || !self.has_data() {
            return None;
        }
        Some(self.total_offers as f64 / self.days_with_data as f64)
    }
}

impl SchemeStatistics for SchemeAStats {
    fn scheme(&self) -> Scheme {
        Scheme::SchemeA
    }

    fn classes(&self) -> Vec<(VehicleClass, RateStatistic)> {
        [
            (VehicleClass::Trailer, self.trailer),
            (VehicleClass::UpTo12t, self.up_to_12t),
            (VehicleClass::UpTo3_5t, self.up_to_3_5t),
        ]
        .into_iter()
        .filter_map(|(class, stat)| stat.map(|s| (class, s)))
        .collect()
    }

    fn statistic(&self, class: VehicleClass) -> Option<RateStatistic> {
        match class {
            VehicleClass::Trailer => self.trailer,
            VehicleClass::UpTo3_5t => self.up_to_3_5t,
            VehicleClass::UpTo12t => self.up_to_12t,
            _ => None,
        }
    }

    fn days_with_data(&self) -> u32 {
        self.days_with_data
    }
}

/// Scheme B: four vehicle classes, sample counts are qualifying record counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeBStats {
    pub days_with_data: u32,
    pub lorry: Option<RateStatistic>,
    pub solo: Option<RateStatistic>,
    pub bus: Option<RateStatistic>,
    pub double_trailer: Option<RateStatistic>,
}

impl SchemeStatistics for SchemeBStats {
    fn scheme(&self) -> Scheme {
        Scheme::SchemeB
    }

    fn classes(&self) -> Vec<(VehicleClass, RateStatistic)> {
        [
            (VehicleClass::Lorry, self.lorry),
            (VehicleClass::DoubleTrailer, self.double_trailer),
            (VehicleClass::Solo, self.solo),
            (VehicleClass::Bus, self.bus),
        ]
        .into_iter()
        .filter_map(|(class, stat)| stat.map(|s| (class, s)))
        .collect()
    }

    fn statistic(&self, class: VehicleClass) -> Option<RateStatistic> {
        match class {
            VehicleClass::Lorry => self.lorry,
            VehicleClass::Solo => self.solo,
            VehicleClass::Bus => self.bus,
            VehicleClass::DoubleTrailer => self.double_trailer,
            _ => None,
        }
    }

    fn days_with_data(&self) -> u32 {
        self.days_with_data
    }
}
