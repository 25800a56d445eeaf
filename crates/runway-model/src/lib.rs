mod domain;
pub use domain::{Labels, RunnerName};
pub use domain::{JIT_CONFIG_PLACEHOLDER, NAME_SUFFIX_LEN, RESERVED_PREFIX};
pub use domain::{
    DEFAULT_RUNNER_GROUP, DEFAULT_RUNNER_USER, RUNNER_GROUP_PLACEHOLDER, RUNNER_USER_PLACEHOLDER,
};

mod error;
pub use error::{ModelError, ModelResult};

mod pool;
pub use pool::{InstanceTemplate, PoolConfig, PoolRegistry};

mod record;
pub use record::{InstanceRecord, InstanceStatus, RunnerRecord, RunnerStatus};
pub use record::{RegistrationRequest, RegistrationToken};

mod event;
pub use event::{JobAction, JobEvent};
