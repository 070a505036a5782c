use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{Coordinate, RouteDistance};
use crate::utils::constants::{OPTIMIZE_FASTEST_ROUTE, TRAVEL_MODE_TRUCK};
use crate::utils::coordinates::round_to;

/// Driving-distance source
pub trait RouteDistanceProvider {
    fn route_distance_km(&self, origin: &Coordinate, destination: &Coordinate) -> Result<f64>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RouteRequest {
    /// [longitude, latitude]
    origin: [f64; 2],
    destination: [f64; 2],
    travel_mode: &'static str,
    optimize_routing_for: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RouteResponse {
    #[serde(default)]
    routes: Vec<RouteBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RouteBody {
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RouteLeg {
    #[serde(default)]
    vehicle_leg_details: Option<VehicleLegDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VehicleLegDetails {
    #[serde(default)]
    travel_steps: Vec<TravelStep>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TravelStep {
    /// Meters
    #[serde(default)]
    distance: f64,
}

impl RouteResponse {
    /// Sum of every travel step of the first route, in km
    fn total_distance_km(&self) -> Option<f64> {
        let route = self.routes.first()?;
        let meters: f64 = route
            .legs
            .iter()
            .filter_map(|leg| leg.vehicle_leg_details.as_ref())
            .flat_map(|details| details.travel_steps.iter())
            .map(|step| step.distance)
            .sum();

        if meters > 0.0 {
            Some(round_to(meters / 1000.0, 2))
        } else {
            None
        }
    }
}

/// Client for a Routes v2 compatible truck routing endpoint
pub struct RoutesApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl RoutesApiClient {
    pub fn new(region: &str, api_key: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, format!("https://routes.geo.{}.amazonaws.com", region), timeout)
    }

    pub fn with_base_url(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("freight-rate-checker/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RouteDistanceProvider for RoutesApiClient {
    fn route_distance_km(&self, origin: &Coordinate, destination: &Coordinate) -> Result<f64> {
        let request = RouteRequest {
            origin: [origin.longitude, origin.latitude],
            destination: [destination.longitude, destination.latitude],
            travel_mode: TRAVEL_MODE_TRUCK,
            optimize_routing_for: OPTIMIZE_FASTEST_ROUTE,
        };

        let response = self
            .http
            .post(format!("{}/v2/routes", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProcessingError::RoutingUnavailable(format!(
                "status {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: RouteResponse = response.json()?;
        payload.total_distance_km().ok_or_else(|| {
            ProcessingError::RoutingUnavailable("response contains no route distance".to_string())
        })
    }
}

/// Turns coordinate pairs into distances with provenance
///
/// Without a provider every routed lookup degrades to the great-circle
/// fallback. Calls to the provider are spaced by the configured delay.
pub struct DistanceResolver {
    provider: Option<Box<dyn RouteDistanceProvider>>,
    request_delay: Duration,
    last_request: Cell<Option<Instant>>,
    routed: Cell<usize>,
    fallbacks: Cell<usize>,
}

impl DistanceResolver {
    pub fn new(provider: Box<dyn RouteDistanceProvider>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::great_circle_only()
        }
    }

    pub fn great_circle_only() -> Self {
        Self {
            provider: None,
            request_delay: Duration::ZERO,
            last_request: Cell::new(None),
            routed: Cell::new(0),
            fallbacks: Cell::new(0),
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Straight-line distance, used for cheap pre-filtering
    pub fn great_circle(&self, origin: &Coordinate, destination: &Coordinate) -> RouteDistance {
        RouteDistance::great_circle(round_to(origin.distance_to(destination), 2))
    }

    /// Routed distance, falling back to great-circle on any provider failure
    pub fn resolve(&self, origin: &Coordinate, destination: &Coordinate) -> RouteDistance {
        let fallback = || {
            self.fallbacks.set(self.fallbacks.get() + 1);
            RouteDistance::fallback(round_to(origin.distance_to(destination), 2))
        };

        let provider = match &self.provider {
            Some(provider) => provider,
            None => return fallback(),
        };

        self.throttle();
        match provider.route_distance_km(origin, destination) {
            Ok(km) => {
                self.routed.set(self.routed.get() + 1);
                debug!("Routed distance {:.2} km", km);
                RouteDistance::routed(km)
            }
            Err(e) => {
                warn!("Routing failed, using great-circle distance: {}", e);
                fallback()
            }
        }
    }

    pub fn routed_count(&self) -> usize {
        self.routed.get()
    }

    pub fn fallback_count(&self) -> usize {
        self.fallbacks.get()
    }

    fn throttle(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < self.request_delay {
                thread::sleep(self.request_delay - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }
}
