pub mod routing;

pub use routing::{DistanceResolver, RouteDistanceProvider, RoutesApiClient};
