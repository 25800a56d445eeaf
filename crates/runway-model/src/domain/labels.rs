use serde::{Deserialize, Serialize};

/// Ordered list of runner / job labels.
///
/// Order is preserved as received from the CI control plane; membership checks are exact.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(pub Vec<String>);

impl Labels {
    /// Create an empty label list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a label list holding a single label.
    pub fn single(label: impl Into<String>) -> Self {
        Self(vec![label.into()])
    }

    /// Returns `true` if no labels are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if `label` is a member of this list.
    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    /// Append a label unless it is already present.
    pub fn push(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        if !self.contains(&label) {
            self.0.push(label);
        }
        self
    }

    /// Iterate through all labels in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Labels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut labels = Labels::new();
        for label in iter {
            labels.push(label);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::Labels;

    #[test]
    fn push_skips_duplicates() {
        let mut labels = Labels::new();
        labels.push("self-hosted").push("linux").push("self-hosted");

        assert_eq!(labels.len(), 2);
        assert_eq!(labels.iter().collect::<Vec<_>>(), ["self-hosted", "linux"]);
    }

    #[test]
    fn contains_is_exact() {
        let labels: Labels = ["runway-large", "linux"].into_iter().collect();

        assert!(labels.contains("runway-large"));
        assert!(!labels.contains("runway"));
        assert!(!labels.contains("Linux"));
    }

    #[test]
    fn serde_is_a_plain_array() {
        let labels = Labels::single("gpu");
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"["gpu"]"#);

        let back: Labels = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(back.len(), 2);
    }
}
