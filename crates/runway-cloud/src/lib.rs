//! HTTP adapters for the CI control plane (GitHub) and the compute provider (OpenStack).
mod error;
pub use error::CloudError;

mod http;

pub mod github;
pub use github::GithubClient;

pub mod openstack;
pub use openstack::{OpenStackClient, OpenStackCredentials, PasswordAuth, StaticAuth};
