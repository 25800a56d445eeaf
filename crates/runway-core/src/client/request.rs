use std::fmt;

use runway_model::{InstanceTemplate, RunnerName};

/// Everything the compute provider needs to boot one runner instance.
#[derive(Clone, PartialEq, Eq)]
pub struct CreateInstanceRequest {
    pub name: RunnerName,
    pub image: String,
    pub flavor: String,
    pub network: String,
    pub key_name: Option<String>,
    /// Rendered cloud-init document. Carries the registration token.
    pub user_data: String,
}

impl CreateInstanceRequest {
    /// Build a request from a pool's instance template.
    pub fn from_template(name: RunnerName, template: &InstanceTemplate, user_data: String) -> Self {
        Self {
            name,
            image: template.image.clone(),
            flavor: template.flavor.clone(),
            network: template.network.clone(),
            key_name: template.key_name.clone(),
            user_data,
        }
    }
}

impl fmt::Debug for CreateInstanceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateInstanceRequest")
            .field("name", &self.name)
            .field("image", &self.image)
            .field("flavor", &self.flavor)
            .field("network", &self.network)
            .field("key_name", &self.key_name)
            .field("user_data_len", &self.user_data.len())
            .finish()
    }
}
