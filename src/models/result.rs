use serde::{Deserialize, Serialize};

use crate::models::partition::RouteRegions;
use crate::models::quote::RouteQuote;
use crate::models::route::RouteEndpoint;

/// Terminal state of a processed route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Success,
    MappingFailed,
    TooShort,
    Error,
}

impl RouteStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RouteStatus::Success)
    }
}

/// Last pipeline stage a route reached; early exits record where they stopped
///
/// Routes waiting for mapping or for the batched lookups never leave the
/// runner, and persistence is implied by presence in a results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStage {
    Mapping,
    DistanceResolved,
    Aggregated,
}

/// How a route distance was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceProvenance {
    /// Driving distance from the routing service
    Routed,
    /// Routing service failed; great-circle substitute
    GreatCircleFallback,
    /// Great-circle distance used for short-route exclusion, routing never called
    GreatCircle,
    /// Endpoint coordinates unknown
    Unavailable,
}

impl DistanceProvenance {
    pub fn label(&self) -> &'static str {
        match self {
            DistanceProvenance::Routed => "routed",
            DistanceProvenance::GreatCircleFallback => "great_circle_fallback",
            DistanceProvenance::GreatCircle => "great_circle",
            DistanceProvenance::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteDistance {
    pub km: f64,
    pub provenance: DistanceProvenance,
}

impl RouteDistance {
    pub fn routed(km: f64) -> Self {
        Self {
            km,
            provenance: DistanceProvenance::Routed,
        }
    }

    pub fn fallback(km: f64) -> Self {
        Self {
            km,
            provenance: DistanceProvenance::GreatCircleFallback,
        }
    }

    pub fn great_circle(km: f64) -> Self {
        Self {
            km,
            provenance: DistanceProvenance::GreatCircle,
        }
    }

    pub fn is_below(&self, threshold_km: f64) -> bool {
        self.km < threshold_km
    }
}

/// One entry of the checkpoint and results files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Route code exactly as it appeared in the input list
    pub route: String,
    pub status: RouteStatus,
    pub origin: Option<RouteEndpoint>,
    pub destination: Option<RouteEndpoint>,
    pub regions: Option<RouteRegions>,
    pub distance_km: Option<f64>,
    pub distance_method: DistanceProvenance,
    pub stage: RouteStage,
    pub reason: Option<String>,
    pub error: Option<String>,
    pub quote: Option<RouteQuote>,
}

impl RouteResult {
    fn base(route: &str, status: RouteStatus, stage: RouteStage) -> Self {
        Self {
            route: route.to_string(),
            status,
            origin: None,
            destination: None,
            regions: None,
            distance_km: None,
            distance_method: DistanceProvenance::Unavailable,
            stage,
            reason: None,
            error: None,
            quote: None,
        }
    }

    pub fn error(route: &str, stage: RouteStage, message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::base(route, RouteStatus::Error, stage)
        }
    }

    pub fn mapping_failed(
        route: &str,
        origin: RouteEndpoint,
        destination: RouteEndpoint,
        regions: RouteRegions,
    ) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            reason: Some(regions.missing_description()),
            regions: Some(regions),
            ..Self::base(route, RouteStatus::MappingFailed, RouteStage::Mapping)
        }
    }

    pub fn too_short(
        route: &str,
        origin: RouteEndpoint,
        destination: RouteEndpoint,
        regions: RouteRegions,
        distance: RouteDistance,
        threshold_km: f64,
    ) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            regions: Some(regions),
            distance_km: Some(distance.km),
            distance_method: distance.provenance,
            reason: Some(format!(
                "distance {:.0} km is below the {:.0} km minimum",
                distance.km, threshold_km
            )),
            ..Self::base(route, RouteStatus::TooShort, RouteStage::DistanceResolved)
        }
    }

    pub fn success(
        route: &str,
        origin: RouteEndpoint,
        destination: RouteEndpoint,
        regions: RouteRegions,
        distance: Option<RouteDistance>,
        quote: RouteQuote,
    ) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            regions: Some(regions),
            distance_km: distance.map(|d| d.km),
            distance_method: distance
                .map(|d| d.provenance)
                .unwrap_or(DistanceProvenance::Unavailable),
            quote: Some(quote),
            ..Self::base(route, RouteStatus::Success, RouteStage::Aggregated)
        }
    }
}
