use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::constants::{NAME_SUFFIX_LEN, RESERVED_PREFIX};

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Name minted for one provisioning attempt.
///
/// The same string names the runner registration and the compute instance;
/// it is the only join key between the two inventories.
///
/// Format: `{RESERVED_PREFIX}{suffix}` where `suffix` is [`NAME_SUFFIX_LEN`] characters
/// drawn uniformly from `[a-z0-9]` (36^12 possible names).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunnerName(String);

impl RunnerName {
    /// Mint a fresh name from the thread-local RNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Mint a fresh name from the given RNG.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = (0..NAME_SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        Self(format!("{RESERVED_PREFIX}{suffix}"))
    }

    /// Returns `true` if `name` carries the reserved prefix followed by a non-empty suffix.
    pub fn is_managed(name: &str) -> bool {
        name.len() > RESERVED_PREFIX.len() && name.starts_with(RESERVED_PREFIX)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunnerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RunnerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RunnerName> for String {
    fn from(n: RunnerName) -> Self {
        n.0
    }
}
