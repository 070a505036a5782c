use rayon::prelude::*;
use tracing::info;

use crate::error::{ProcessingError, Result};
use crate::models::{
    CrossSchemeIndex, CrossSchemeMatch, PartitionCenter, PartitionId, PostalPartitionTable,
    PostalTableEntry,
};
use crate::utils::constants::{POSTAL_PREFIX_LENGTHS, SAME_COUNTRY_DISTANCE_FACTOR};
use crate::utils::coordinates::round_to;

/// Nearest candidate by great-circle distance, halved for same-country candidates
///
/// Ties keep the first minimum in candidate order.
pub fn nearest_partition(
    center: &PartitionCenter,
    candidates: &[PartitionCenter],
) -> Option<CrossSchemeMatch> {
    let origin = center.coordinate();
    let mut best: Option<CrossSchemeMatch> = None;

    for candidate in candidates {
        let distance = origin.distance_to(&candidate.coordinate());
        let effective = if candidate.is_same_country(center) {
            distance * SAME_COUNTRY_DISTANCE_FACTOR
        } else {
            distance
        };

        let is_better = best
            .as_ref()
            .map_or(true, |current| effective < current.effective_distance_km);

        if is_better {
            best = Some(CrossSchemeMatch {
                partition_id: candidate.id,
                distance_km: distance,
                effective_distance_km: effective,
                country: candidate.country.to_ascii_uppercase(),
            });
        }
    }

    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub matched: usize,
    pub mean_distance_km: f64,
    pub max_distance_km: f64,
    pub cross_country_matches: usize,
}

impl IndexReport {
    pub fn summary(&self) -> String {
        format!(
            "{} partitions matched, mean distance {:.2} km, max {:.2} km, {} cross-country",
            self.matched, self.mean_distance_km, self.max_distance_km, self.cross_country_matches
        )
    }
}

/// Offline builder for the Scheme A -> Scheme B nearest-partition index
pub struct CrossSchemeIndexBuilder {
    max_workers: usize,
}

impl CrossSchemeIndexBuilder {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// O(|A|·|B|): every Scheme A partition scans every Scheme B partition
    pub fn build(
        &self,
        scheme_a: &[PartitionCenter],
        scheme_b: &[PartitionCenter],
    ) -> Result<(CrossSchemeIndex, IndexReport)> {
        if scheme_b.is_empty() {
            return Err(ProcessingError::MissingData(
                "no Scheme B partitions to match against".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        // The outer scan is parallel, each inner scan keeps candidate order
        let matches: Vec<(PartitionId, Option<CrossSchemeMatch>, String)> = pool.install(|| {
            scheme_a
                .par_iter()
                .map(|center| {
                    (
                        center.id,
                        nearest_partition(center, scheme_b),
                        center.country.to_ascii_uppercase(),
                    )
                })
                .collect()
        });

        let mut index = CrossSchemeIndex::new();
        let mut total_distance = 0.0;
        let mut max_distance: f64 = 0.0;
        let mut cross_country = 0;

        for (id, matched, country) in matches {
            if let Some(mut matched) = matched {
                total_distance += matched.distance_km;
                max_distance = max_distance.max(matched.distance_km);
                if matched.country != country {
                    cross_country += 1;
                }
                matched.distance_km = round_to(matched.distance_km, 2);
                matched.effective_distance_km = round_to(matched.effective_distance_km, 2);
                index.insert(id, matched);
            }
        }

        let report = IndexReport {
            matched: index.len(),
            mean_distance_km: if index.is_empty() {
                0.0
            } else {
                total_distance / index.len() as f64
            },
            max_distance_km: max_distance,
            cross_country_matches: cross_country,
        };

        info!("Cross-scheme index built: {}", report.summary());

        Ok((index, report))
    }
}

impl Default for CrossSchemeIndexBuilder {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

/// Postal-to-partition table from partition centers
///
/// Each center registers its country plus 2, 3 and 4 leading postal digits and
/// its full code without separators. The first center to claim a key keeps it.
pub fn build_postal_table(centers: &[PartitionCenter]) -> PostalPartitionTable {
    let mut table = PostalPartitionTable::new();

    for center in centers {
        let country = center.country.trim().to_ascii_uppercase();
        let postal = center.postal_code.trim();
        let entry = PostalTableEntry {
            partition_id: center.id,
            distance_km: Some(0.0),
        };

        for len in POSTAL_PREFIX_LENGTHS {
            if let Some(prefix) = postal.get(..len) {
                if postal.chars().count() >= len {
                    table.insert_if_absent(format!("{}{}", country, prefix), entry);
                }
            }
        }

        let full_code: String = postal
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();
        if !full_code.is_empty() {
            table.insert_if_absent(format!("{}{}", country, full_code), entry);
        }
    }

    table
}
