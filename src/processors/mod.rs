pub mod batch_runner;
pub mod cross_scheme;
pub mod quote_aggregator;
pub mod region_mapper;

pub use batch_runner::{
    resumable_output, resume_offset, BatchOptions, BatchOutcome, BatchRunner, BatchSummary,
};
pub use cross_scheme::{build_postal_table, nearest_partition, CrossSchemeIndexBuilder, IndexReport};
pub use quote_aggregator::{window_quote, QuoteAggregator};
pub use region_mapper::RegionMapper;
