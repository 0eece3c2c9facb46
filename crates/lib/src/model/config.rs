//! Construction-time configuration for a [`Model`](super::Model).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::ModelError;

/// Where the model runs.
///
/// In the browser the model drives a linked view adapter. On the server
/// there is no live view: bindings are still recorded but nothing is
/// delivered, and linking an adapter is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Server,
    #[default]
    Browser,
}

impl Environment {
    /// Whether view updates are delivered in this environment.
    pub fn delivers_updates(self) -> bool {
        matches!(self, Environment::Browser)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Server => write!(f, "server"),
            Environment::Browser => write!(f, "browser"),
        }
    }
}

impl FromStr for Environment {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(Environment::Server),
            "browser" => Ok(Environment::Browser),
            other => Err(ModelError::TypeMismatch {
                expected: "\"server\" or \"browser\"".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

/// Configuration passed to [`Model::with_config`](super::Model::with_config).
///
/// # Example
///
/// ```
/// use livemodel::model::{Environment, ModelConfig};
///
/// let config: ModelConfig = serde_json::from_str(r#"{"environment": "server"}"#).unwrap();
/// assert_eq!(config.environment, Environment::Server);
///
/// // Missing fields fall back to defaults
/// let config: ModelConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(config.environment, Environment::Browser);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub environment: Environment,
}

impl ModelConfig {
    pub fn server() -> Self {
        Self {
            environment: Environment::Server,
        }
    }

    pub fn browser() -> Self {
        Self {
            environment: Environment::Browser,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}
