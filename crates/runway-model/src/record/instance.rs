use std::{convert::Infallible, fmt, str::FromStr, time::Duration};

use time::OffsetDateTime;

use crate::RunnerName;

/// Instance lifecycle state as reported by the compute provider.
///
/// Parsing never fails: unrecognized states are kept verbatim in [`InstanceStatus::Other`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstanceStatus {
    /// Being built; counts as live.
    Build,
    /// Running.
    Active,
    /// Provider failed the instance.
    Error,
    /// Deletion in progress.
    Deleting,
    Other(String),
}

impl InstanceStatus {
    /// `Build` and `Active` instances back a runner; anything else does not.
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, InstanceStatus::Build | InstanceStatus::Active)
    }
}

impl FromStr for InstanceStatus {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "BUILD" | "BUILDING" => InstanceStatus::Build,
            "ACTIVE" => InstanceStatus::Active,
            "ERROR" => InstanceStatus::Error,
            "DELETED" | "SOFT_DELETED" | "DELETING" => InstanceStatus::Deleting,
            _ => InstanceStatus::Other(s.to_string()),
        })
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceStatus::Build => f.write_str("BUILD"),
            InstanceStatus::Active => f.write_str("ACTIVE"),
            InstanceStatus::Error => f.write_str("ERROR"),
            InstanceStatus::Deleting => f.write_str("DELETING"),
            InstanceStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Compute instance as listed by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceRecord {
    /// Provider-assigned id.
    pub id: String,
    pub name: String,
    pub status: InstanceStatus,
    /// Creation time, if the provider reports one.
    pub created_at: Option<OffsetDateTime>,
}

impl InstanceRecord {
    /// Returns `true` if this instance was created by this system.
    #[inline]
    pub fn is_managed(&self) -> bool {
        RunnerName::is_managed(&self.name)
    }

    /// Age of the instance at `now`; `None` if the creation time is unknown.
    ///
    /// Timestamps in the future yield a zero age.
    pub fn age(&self, now: OffsetDateTime) -> Option<Duration> {
        let created = self.created_at?;
        Some((now - created).try_into().unwrap_or(Duration::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(created_at: Option<OffsetDateTime>) -> InstanceRecord {
        InstanceRecord {
            id: "f3a1".into(),
            name: "gha-abc".into(),
            status: InstanceStatus::Active,
            created_at,
        }
    }

    #[test]
    fn parses_nova_states() {
        let parsed = |s: &str| s.parse::<InstanceStatus>().unwrap();

        assert_eq!(parsed("ACTIVE"), InstanceStatus::Active);
        assert_eq!(parsed("build"), InstanceStatus::Build);
        assert_eq!(parsed("ERROR"), InstanceStatus::Error);
        assert_eq!(parsed("SOFT_DELETED"), InstanceStatus::Deleting);
        assert_eq!(parsed("SHUTOFF"), InstanceStatus::Other("SHUTOFF".into()));
    }

    #[test]
    fn only_build_and_active_are_live() {
        assert!(InstanceStatus::Build.is_live());
        assert!(InstanceStatus::Active.is_live());
        assert!(!InstanceStatus::Error.is_live());
        assert!(!InstanceStatus::Deleting.is_live());
        assert!(!InstanceStatus::Other("SHUTOFF".into()).is_live());
    }

    #[test]
    fn age_is_measured_from_created_at() {
        let now = OffsetDateTime::now_utc();
        let i = instance(Some(now - Duration::from_secs(90)));

        assert_eq!(i.age(now), Some(Duration::from_secs(90)));
        assert_eq!(instance(None).age(now), None);
    }

    #[test]
    fn future_created_at_yields_zero_age() {
        let now = OffsetDateTime::now_utc();
        let i = instance(Some(now + Duration::from_secs(30)));

        assert_eq!(i.age(now), Some(Duration::ZERO));
    }
}
