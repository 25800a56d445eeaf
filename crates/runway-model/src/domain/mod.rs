mod labels;
pub use labels::Labels;

mod name;
pub use name::RunnerName;

mod constants;
pub use constants::{
    DEFAULT_RUNNER_GROUP, DEFAULT_RUNNER_USER, JIT_CONFIG_PLACEHOLDER, NAME_SUFFIX_LEN,
    RESERVED_PREFIX, RUNNER_GROUP_PLACEHOLDER, RUNNER_USER_PLACEHOLDER,
};
