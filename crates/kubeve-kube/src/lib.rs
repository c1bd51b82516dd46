//! Cluster transport for kubeve: event listing and watching, object reads
//! for drill-down, and an in-memory mock for tests.

pub mod drilldown;
pub mod error;
pub mod kind;
pub mod kubectl;
pub mod mock;
pub mod source;
pub mod wire;

pub use drilldown::{fetch_drilldown, DrillDown, DrillDownTarget};
pub use error::TransportError;
pub use kind::{ListOptions, ResourceKind};
pub use kubectl::{KubectlClient, KubectlConfig};
pub use source::{
    ClusterInfo, ClusterSource, EventListing, EventSource, EventStream, LogOptions, ObjectSource,
};
