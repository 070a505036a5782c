use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::models::route::RouteEndpoint;

pub type PartitionId = i64;

/// The two freight-exchange partitioning schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    SchemeA,
    SchemeB,
}

impl Scheme {
    pub fn display_name(&self) -> &'static str {
        match self {
            Scheme::SchemeA => "Scheme A",
            Scheme::SchemeB => "Scheme B",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Origin and destination partition of a route within one scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionPair {
    pub start: PartitionId,
    pub end: PartitionId,
}

impl PartitionPair {
    pub fn new(start: PartitionId, end: PartitionId) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for PartitionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.start, self.end)
    }
}

/// Partitions resolved for a single postal location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndpointPartitions {
    pub scheme_a: Option<PartitionId>,
    pub scheme_b: Option<PartitionId>,
    /// Scheme B came from the cross-scheme index rather than its own postal table
    pub scheme_b_derived: bool,
}

impl EndpointPartitions {
    pub fn is_complete(&self) -> bool {
        self.scheme_a.is_some() && self.scheme_b.is_some()
    }
}

/// Everything the mapper found for a route, including partial results
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteRegions {
    pub origin: EndpointPartitions,
    pub destination: EndpointPartitions,
}

impl RouteRegions {
    /// Both endpoints resolved in both schemes
    pub fn complete(&self) -> Option<PartitionMapping> {
        Some(PartitionMapping {
            scheme_a: PartitionPair::new(self.origin.scheme_a?, self.destination.scheme_a?),
            scheme_b: PartitionPair::new(self.origin.scheme_b?, self.destination.scheme_b?),
        })
    }

    /// Like [`RouteRegions::complete`], naming the missing lookups on failure
    pub fn require_complete(&self, route: &str) -> Result<PartitionMapping> {
        self.complete().ok_or_else(|| ProcessingError::MappingFailure {
            route: route.to_string(),
            reason: self.missing_description(),
        })
    }

    pub fn missing_description(&self) -> String {
        let mut missing = Vec::new();
        let sides = [("origin", &self.origin), ("destination", &self.destination)];
        for (side, partitions) in sides {
            if partitions.scheme_a.is_none() {
                missing.push(format!("{} {}", side, Scheme::SchemeA));
            }
            if partitions.scheme_b.is_none() {
                missing.push(format!("{} {}", side, Scheme::SchemeB));
            }
        }
        format!("no partition for {}", missing.join(", "))
    }
}

/// A fully resolved route: one partition pair per scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionMapping {
    pub scheme_a: PartitionPair,
    pub scheme_b: PartitionPair,
}

impl PartitionMapping {
    pub fn pair(&self, scheme: Scheme) -> PartitionPair {
        match scheme {
            Scheme::SchemeA => self.scheme_a,
            Scheme::SchemeB => self.scheme_b,
        }
    }
}

/// One row of a postal-to-partition table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPostalEntry")]
pub struct PostalTableEntry {
    pub partition_id: PartitionId,
    pub distance_km: Option<f64>,
}

/// Tables exported by older tooling store either a bare ID or an object
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPostalEntry {
    Id(PartitionId),
    Record {
        #[serde(alias = "region_id", alias = "timocom_id")]
        partition_id: PartitionId,
        #[serde(default)]
        distance_km: Option<f64>,
    },
}

impl From<RawPostalEntry> for PostalTableEntry {
    fn from(raw: RawPostalEntry) -> Self {
        match raw {
            RawPostalEntry::Id(partition_id) => Self {
                partition_id,
                distance_km: None,
            },
            RawPostalEntry::Record {
                partition_id,
                distance_km,
            } => Self {
                partition_id,
                distance_km,
            },
        }
    }
}

/// Postal key (at 2, 3, 4 digits or the full code) to partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostalPartitionTable {
    entries: HashMap<String, PostalTableEntry>,
}

impl PostalPartitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key unless it is already mapped; returns whether it was inserted
    pub fn insert_if_absent(&mut self, key: String, entry: PostalTableEntry) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    pub fn get(&self, key: &str) -> Option<&PostalTableEntry> {
        self.entries.get(key)
    }

    /// Most specific key first, falling back to shorter prefixes
    pub fn lookup(&self, endpoint: &RouteEndpoint) -> Option<PartitionId> {
        endpoint
            .lookup_keys()
            .iter()
            .find_map(|key| self.entries.get(key))
            .map(|entry| entry.partition_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key, for stable output files
    pub fn sorted(&self) -> BTreeMap<&str, &PostalTableEntry> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

impl FromIterator<(String, PostalTableEntry)> for PostalPartitionTable {
    fn from_iter<I: IntoIterator<Item = (String, PostalTableEntry)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, entry) in iter {
            table.insert_if_absent(key, entry);
        }
        table
    }
}

/// Nearest Scheme B partition for one Scheme A partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSchemeMatch {
    #[serde(alias = "region_id", alias = "timocom_id")]
    pub partition_id: PartitionId,

    /// Raw great-circle distance between the two centroids
    #[serde(default)]
    pub distance_km: f64,

    /// Distance after the same-country factor, the value the match minimized
    #[serde(default)]
    pub effective_distance_km: f64,

    #[serde(default)]
    pub country: String,
}

/// Scheme A partition ID to nearest Scheme B partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossSchemeIndex {
    matches: BTreeMap<PartitionId, CrossSchemeMatch>,
}

impl CrossSchemeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scheme_a_id: PartitionId, matched: CrossSchemeMatch) {
        self.matches.insert(scheme_a_id, matched);
    }

    pub fn get(&self, scheme_a_id: PartitionId) -> Option<&CrossSchemeMatch> {
        self.matches.get(&scheme_a_id)
    }

    pub fn scheme_b_for(&self, scheme_a_id: PartitionId) -> Option<PartitionId> {
        self.get(scheme_a_id).map(|m| m.partition_id)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PartitionId, &CrossSchemeMatch)> {
        self.matches.iter()
    }
}
