//! Cloud-init bootstrap payload carrying the registration token into the instance.
//!
//! The payload is a `#cloud-config` document with exactly two directives:
//! - `write_files`: the startup script at [`START_SCRIPT_PATH`], token and runner account substituted;
//! - `runcmd`: executes that script on first boot.
use std::sync::Arc;

use serde::Serialize;

use crate::error::CoreError;
use runway_model::{
    InstanceTemplate, JIT_CONFIG_PLACEHOLDER, RUNNER_GROUP_PLACEHOLDER, RUNNER_USER_PLACEHOLDER,
    RegistrationToken,
};

/// Startup script shipped with the crate.
pub const DEFAULT_START_SCRIPT: &str = include_str!("../../scripts/start.sh");

/// Where the startup script lands inside the instance.
pub const START_SCRIPT_PATH: &str = "/start.sh";

const START_SCRIPT_PERMISSIONS: &str = "0755";
const CLOUD_CONFIG_HEADER: &str = "#cloud-config\n";

/// Startup script template containing [`JIT_CONFIG_PLACEHOLDER`].
///
/// [`RUNNER_USER_PLACEHOLDER`] and [`RUNNER_GROUP_PLACEHOLDER`] are optional.
#[derive(Clone, Debug)]
pub struct BootstrapTemplate {
    script: Arc<str>,
}

impl BootstrapTemplate {
    /// Wrap a custom script template.
    ///
    /// Fails if the template has no token placeholder: the runner could never register.
    pub fn new(script: impl Into<Arc<str>>) -> Result<Self, CoreError> {
        let script = script.into();
        if !script.contains(JIT_CONFIG_PLACEHOLDER) {
            return Err(CoreError::Config(format!(
                "bootstrap script has no {JIT_CONFIG_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self { script })
    }

    /// Template backed by [`DEFAULT_START_SCRIPT`].
    pub fn embedded() -> Self {
        Self {
            script: Arc::from(DEFAULT_START_SCRIPT),
        }
    }

    /// Substitute the token and the pool's runner account, then build the cloud-init payload.
    pub fn render(&self, token: &RegistrationToken, instance: &InstanceTemplate) -> BootstrapPayload {
        let content = self
            .script
            .replace(JIT_CONFIG_PLACEHOLDER, token.expose())
            .replace(RUNNER_USER_PLACEHOLDER, &instance.runner_user)
            .replace(RUNNER_GROUP_PLACEHOLDER, &instance.runner_group);

        BootstrapPayload {
            write_files: vec![WriteFile {
                path: START_SCRIPT_PATH.into(),
                content,
                permissions: START_SCRIPT_PERMISSIONS.into(),
            }],
            runcmd: vec![START_SCRIPT_PATH.into()],
        }
    }
}

impl Default for BootstrapTemplate {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Declarative startup document consumed by cloud-init.
#[derive(Debug, Serialize)]
pub struct BootstrapPayload {
    pub write_files: Vec<WriteFile>,
    pub runcmd: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WriteFile {
    pub path: String,
    pub content: String,
    pub permissions: String,
}

impl BootstrapPayload {
    /// Serialize as cloud-init user data.
    pub fn to_user_data(&self) -> Result<String, serde_yaml::Error> {
        Ok(format!("{CLOUD_CONFIG_HEADER}{}", serde_yaml::to_string(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pool;

    fn template() -> InstanceTemplate {
        pool("runway-small", 1).instance
    }

    #[test]
    fn embedded_script_carries_placeholder() {
        assert!(DEFAULT_START_SCRIPT.contains(JIT_CONFIG_PLACEHOLDER));
    }

    #[test]
    fn render_substitutes_token_into_script() {
        let token = RegistrationToken::new("eyJqaXQiOiJ0b2tlbiJ9", Some(5));
        let payload = BootstrapTemplate::embedded().render(&token, &template());

        assert_eq!(payload.write_files.len(), 1);
        let file = &payload.write_files[0];
        assert_eq!(file.path, START_SCRIPT_PATH);
        assert_eq!(file.permissions, "0755");
        assert!(file.content.contains("eyJqaXQiOiJ0b2tlbiJ9"));
        assert!(!file.content.contains(JIT_CONFIG_PLACEHOLDER));
        assert_eq!(payload.runcmd, vec![START_SCRIPT_PATH.to_string()]);
    }

    #[test]
    fn user_data_is_a_cloud_config_document() {
        let template = BootstrapTemplate::new("#!/bin/sh\nrun --jit ___JIT_CONFIG___\n").unwrap();
        let user_data = template
            .render(&RegistrationToken::new("abc", None), &self::template())
            .to_user_data()
            .unwrap();

        assert!(user_data.starts_with("#cloud-config\n"));

        let doc: serde_yaml::Value =
            serde_yaml::from_str(user_data.trim_start_matches(CLOUD_CONFIG_HEADER)).unwrap();
        assert_eq!(doc["runcmd"][0].as_str(), Some("/start.sh"));
        assert_eq!(doc["write_files"][0]["path"].as_str(), Some("/start.sh"));
        assert_eq!(
            doc["write_files"][0]["content"].as_str(),
            Some("#!/bin/sh\nrun --jit abc\n")
        );
    }

    #[test]
    fn render_substitutes_runner_account() {
        let mut instance = template();
        instance.runner_user = "ci".into();
        instance.runner_group = "docker".into();
        let payload =
            BootstrapTemplate::embedded().render(&RegistrationToken::new("tok", None), &instance);

        let content = &payload.write_files[0].content;
        assert!(content.contains("RUNNER_USER=ci\n"), "{content}");
        assert!(content.contains("RUNNER_GROUP=docker\n"), "{content}");
        assert!(!content.contains(RUNNER_USER_PLACEHOLDER));
        assert!(!content.contains(RUNNER_GROUP_PLACEHOLDER));
    }

    #[test]
    fn custom_script_may_omit_account_markers() {
        let script =
            BootstrapTemplate::new("#!/bin/sh\n./run.sh --jitconfig ___JIT_CONFIG___\n").unwrap();
        let payload = script.render(&RegistrationToken::new("tok", None), &template());

        assert_eq!(
            payload.write_files[0].content,
            "#!/bin/sh\n./run.sh --jitconfig tok\n"
        );
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let res = BootstrapTemplate::new("#!/bin/sh\necho hi\n");
        assert!(matches!(res, Err(CoreError::Config(_))));
    }
}
