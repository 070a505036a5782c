pub mod batch;
pub mod query;
pub mod sqlite;

pub use batch::{fetch_batch_statistics, BatchStatistics, StatsLookup};
pub use sqlite::SqliteRateStore;

use std::collections::HashMap;

use crate::error::Result;
use crate::models::{LookbackWindow, PartitionPair, SchemeAStats, SchemeBStats};

/// Historical rate statistics source
///
/// Each call is one aggregate query covering every requested pair. Pairs with
/// no qualifying rows are absent from the returned map.
pub trait RateStore {
    fn query_scheme_a(
        &self,
        pairs: &[PartitionPair],
        window: LookbackWindow,
    ) -> Result<HashMap<PartitionPair, SchemeAStats>>;

    fn query_scheme_b(
        &self,
        pairs: &[PartitionPair],
        window: LookbackWindow,
    ) -> Result<HashMap<PartitionPair, SchemeBStats>>;
}
