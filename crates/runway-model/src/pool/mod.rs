mod config;
pub use config::{InstanceTemplate, PoolConfig};

mod registry;
pub use registry::PoolRegistry;
