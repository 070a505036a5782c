use std::collections::HashMap;

use crate::models::geo::Coordinate;
use crate::models::partition::{CrossSchemeIndex, PostalPartitionTable};
use crate::models::route::PostalKey;

/// Static lookup tables, loaded once and shared read-only by the mapper and runner
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub postal_coordinates: HashMap<PostalKey, Coordinate>,
    pub scheme_a_postal: PostalPartitionTable,
    pub scheme_b_postal: PostalPartitionTable,
    pub cross_scheme: CrossSchemeIndex,
}

impl ReferenceData {
    pub fn new(
        postal_coordinates: HashMap<PostalKey, Coordinate>,
        scheme_a_postal: PostalPartitionTable,
        scheme_b_postal: PostalPartitionTable,
        cross_scheme: CrossSchemeIndex,
    ) -> Self {
        Self {
            postal_coordinates,
            scheme_a_postal,
            scheme_b_postal,
            cross_scheme,
        }
    }

    pub fn coordinate(&self, key: &PostalKey) -> Option<Coordinate> {
        self.postal_coordinates.get(key).copied()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} postal coordinates, {} Scheme A postal keys, {} Scheme B postal keys, {} cross-scheme matches",
            self.postal_coordinates.len(),
            self.scheme_a_postal.len(),
            self.scheme_b_postal.len(),
            self.cross_scheme.len()
        )
    }
}
