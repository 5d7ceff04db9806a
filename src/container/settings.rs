use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTAINER_NAME: &str = "[DEFAULT]";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Name used in log output. Falls back to [`DEFAULT_CONTAINER_NAME`].
    pub name: Option<String>,
    /// Release tracked transient disposables when the container is dropped.
    pub dispose_on_drop: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            name: None,
            dispose_on_drop: true,
        }
    }
}

impl ContainerSettings {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_dispose_on_drop(mut self, dispose_on_drop: bool) -> Self {
        self.dispose_on_drop = dispose_on_drop;
        self
    }

    pub fn resolved_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CONTAINER_NAME)
    }
}
