pub mod partition_reader;
pub mod reference_reader;
pub mod route_reader;

pub use partition_reader::PartitionReader;
pub use reference_reader::ReferenceReader;
pub use route_reader::RouteReader;
