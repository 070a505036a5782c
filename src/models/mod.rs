pub mod geo;
pub mod partition;
pub mod quote;
pub mod rates;
pub mod reference;
pub mod result;
pub mod route;

pub use geo::{Coordinate, PartitionCenter};
pub use partition::{
    CrossSchemeIndex, CrossSchemeMatch, EndpointPartitions, PartitionId, PartitionMapping,
    PartitionPair, PostalPartitionTable, PostalTableEntry, RouteRegions, Scheme,
};
pub use quote::{DataSource, RouteQuote, WindowQuote};
pub use rates::{
    LookbackWindow, RateStatistic, SchemeAStats, SchemeBStats, SchemeStatistics, VehicleClass,
};
pub use reference::ReferenceData;
pub use result::{DistanceProvenance, RouteDistance, RouteResult, RouteStage, RouteStatus};
pub use route::{parse_route_code, PostalKey, RouteCode, RouteEndpoint};
