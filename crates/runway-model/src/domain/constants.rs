//! Well-known strings shared by the provisioner, the garbage collector and the adapters.

/// Prefix carried by every runner and instance name this system creates.
///
/// Ownership rule: resources without this prefix are never created, counted or deleted.
pub const RESERVED_PREFIX: &str = "gha-";

/// Length of the random suffix appended to [`RESERVED_PREFIX`].
pub const NAME_SUFFIX_LEN: usize = 12;

/// Marker in the startup script template that is replaced by the registration token.
pub const JIT_CONFIG_PLACEHOLDER: &str = "___JIT_CONFIG___";

/// Marker replaced by the pool's `runner_user`.
pub const RUNNER_USER_PLACEHOLDER: &str = "___RUNNER_USER___";

/// Marker replaced by the pool's `runner_group`.
pub const RUNNER_GROUP_PLACEHOLDER: &str = "___RUNNER_GROUP___";

/// Account the runner process runs as when a pool does not name one.
pub const DEFAULT_RUNNER_USER: &str = "runner";

/// Primary group of [`DEFAULT_RUNNER_USER`].
pub const DEFAULT_RUNNER_GROUP: &str = "runner";
