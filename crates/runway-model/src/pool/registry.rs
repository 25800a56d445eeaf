use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    Labels,
    error::{ModelError, ModelResult},
    pool::PoolConfig,
};

/// Immutable, ordered set of pool policies.
///
/// Pools keep the order they were configured in. That order is the tie-break
/// when a job's labels match more than one pool: the first match wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PoolConfig>", into = "Vec<PoolConfig>")]
pub struct PoolRegistry {
    pools: Vec<PoolConfig>,
}

impl PoolRegistry {
    /// Build a registry, validating every pool and rejecting duplicate labels.
    pub fn new(pools: Vec<PoolConfig>) -> ModelResult<Self> {
        let mut seen = HashSet::with_capacity(pools.len());
        for pool in &pools {
            pool.validate()?;
            if !seen.insert(pool.label.as_str()) {
                return Err(ModelError::DuplicatePool(pool.label.clone()));
            }
        }
        Ok(Self { pools })
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Iterate pools in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &PoolConfig> {
        self.pools.iter()
    }

    /// Look a pool up by its label.
    pub fn get(&self, label: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.label == label)
    }

    /// Pick the first pool (configuration order) whose label is in `labels`.
    pub fn first_match(&self, labels: &Labels) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| labels.contains(&p.label))
    }
}

impl TryFrom<Vec<PoolConfig>> for PoolRegistry {
    type Error = ModelError;
    fn try_from(pools: Vec<PoolConfig>) -> Result<Self, Self::Error> {
        Self::new(pools)
    }
}

impl From<PoolRegistry> for Vec<PoolConfig> {
    fn from(r: PoolRegistry) -> Self {
        r.pools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InstanceTemplate;

    fn pool(label: &str, min_ready: u32) -> PoolConfig {
        PoolConfig {
            label: label.into(),
            min_ready,
            runner_group_id: 1,
            instance: InstanceTemplate {
                image: "img".into(),
                flavor: "flv".into(),
                network: "net".into(),
                key_name: Some("ops".into()),
                runner_user: "runner".into(),
                runner_group: "runner".into(),
            },
        }
    }

    #[test]
    fn rejects_duplicate_labels() {
        let res = PoolRegistry::new(vec![pool("a", 1), pool("b", 1), pool("a", 2)]);
        assert!(matches!(res, Err(ModelError::DuplicatePool(l)) if l == "a"));
    }

    #[test]
    fn first_match_follows_configuration_order() {
        let registry = PoolRegistry::new(vec![pool("small", 1), pool("large", 1)]).unwrap();

        let labels: Labels = ["self-hosted", "large", "small"].into_iter().collect();
        let picked = registry.first_match(&labels).expect("pool should match");
        assert_eq!(picked.label, "small");
    }

    #[test]
    fn first_match_returns_none_without_overlap() {
        let registry = PoolRegistry::new(vec![pool("small", 1)]).unwrap();
        let labels: Labels = ["ubuntu-latest"].into_iter().collect();

        assert!(registry.first_match(&labels).is_none());
    }

    #[test]
    fn deserialization_validates() {
        let json = r#"[
            {"label": "a", "runner_group_id": 1, "instance": {"image": "i", "flavor": "f", "network": "n"}},
            {"label": "a", "runner_group_id": 2, "instance": {"image": "i", "flavor": "f", "network": "n"}}
        ]"#;
        let err = serde_json::from_str::<PoolRegistry>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate pool label"));
    }

    #[test]
    fn get_finds_by_label() {
        let registry = PoolRegistry::new(vec![pool("small", 2), pool("large", 0)]).unwrap();

        assert_eq!(registry.get("large").map(|p| p.min_ready), Some(0));
        assert!(registry.get("medium").is_none());
        assert_eq!(registry.len(), 2);
    }
}
