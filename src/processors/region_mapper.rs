use tracing::debug;

use crate::models::{
    Coordinate, EndpointPartitions, PostalKey, ReferenceData, RouteCode, RouteEndpoint,
    RouteRegions,
};

/// Resolves route endpoints to partitions in both schemes
pub struct RegionMapper<'a> {
    reference: &'a ReferenceData,
}

impl<'a> RegionMapper<'a> {
    pub fn new(reference: &'a ReferenceData) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &'a ReferenceData {
        self.reference
    }

    /// Look up both schemes for one endpoint
    ///
    /// Scheme B falls back to the cross-scheme index keyed by the Scheme A
    /// partition when its own postal table has no entry.
    pub fn resolve_partitions(&self, endpoint: &RouteEndpoint) -> EndpointPartitions {
        let scheme_a = self.reference.scheme_a_postal.lookup(endpoint);
        let direct_b = self.reference.scheme_b_postal.lookup(endpoint);

        match (direct_b, scheme_a) {
            (Some(scheme_b), _) => EndpointPartitions {
                scheme_a,
                scheme_b: Some(scheme_b),
                scheme_b_derived: false,
            },
            (None, Some(a_id)) => {
                let derived = self.reference.cross_scheme.scheme_b_for(a_id);
                if derived.is_some() {
                    debug!(
                        "{}: Scheme B derived from Scheme A partition {}",
                        endpoint.code(),
                        a_id
                    );
                }
                EndpointPartitions {
                    scheme_a,
                    scheme_b: derived,
                    scheme_b_derived: derived.is_some(),
                }
            }
            (None, None) => EndpointPartitions::default(),
        }
    }

    pub fn resolve_postal_key(&self, key: &PostalKey) -> EndpointPartitions {
        self.resolve_partitions(&RouteEndpoint::from_postal_key(key))
    }

    pub fn map_route(&self, route: &RouteCode) -> RouteRegions {
        RouteRegions {
            origin: self.resolve_partitions(route.origin()),
            destination: self.resolve_partitions(route.destination()),
        }
    }

    /// Coordinates of both endpoints, if the coordinate table knows them
    pub fn endpoint_coordinates(&self, route: &RouteCode) -> Option<(Coordinate, Coordinate)> {
        let origin = self.reference.coordinate(&route.origin().postal_key())?;
        let destination = self.reference.coordinate(&route.destination().postal_key())?;
        Some((origin, destination))
    }
}
