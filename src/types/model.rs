use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A GLM model identifier.
///
/// This can be one of the models the service is known to offer or a custom
/// string for models added after this crate was released.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions.
    Known(KnownModel),

    /// Custom model identifier.
    Custom(String),
}

/// Models the Z.AI chat service is known to serve.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// GLM-5, the service default.
    #[serde(rename = "glm-5")]
    Glm5,

    /// GLM-4.7
    #[serde(rename = "glm-4.7")]
    Glm47,

    /// GLM-4.5
    #[serde(rename = "glm-4.5")]
    Glm45,
}

impl KnownModel {
    /// Every known model, default first.
    pub const ALL: [KnownModel; 3] = [KnownModel::Glm5, KnownModel::Glm47, KnownModel::Glm45];

    /// The wire identifier of this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Glm5 => "glm-5",
            KnownModel::Glm47 => "glm-4.7",
            KnownModel::Glm45 => "glm-4.5",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Glm5)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{}", known_model),
            Model::Custom(custom) => write!(f, "{}", custom),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownModel(pub String);

impl fmt::Display for UnknownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown model: {}", self.0)
    }
}

impl std::error::Error for UnknownModel {}

impl FromStr for KnownModel {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        KnownModel::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

impl FromStr for Model {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<KnownModel>().map(Model::Known)
    }
}

impl Model {
    /// Parses a known model, falling back to a custom identifier.
    pub fn parse_or_custom(s: &str) -> Self {
        s.parse()
            .unwrap_or_else(|_| Model::Custom(s.trim().to_string()))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_serialization() {
        let json = serde_json::to_string(&Model::Known(KnownModel::Glm47)).unwrap();
        assert_eq!(json, r#""glm-4.7""#);
        let json = serde_json::to_string(&Model::Custom("glm-6-preview".to_string())).unwrap();
        assert_eq!(json, r#""glm-6-preview""#);
    }

    #[test]
    fn model_deserialization() {
        let model: Model = serde_json::from_str(r#""glm-4.5""#).unwrap();
        assert_eq!(model, Model::Known(KnownModel::Glm45));
        let model: Model = serde_json::from_str(r#""glm-9""#).unwrap();
        assert_eq!(model, Model::Custom("glm-9".to_string()));
    }

    #[test]
    fn parse_models() {
        assert_eq!("GLM-5".parse::<Model>(), Ok(Model::Known(KnownModel::Glm5)));
        assert!("glm-9".parse::<Model>().is_err());
        assert_eq!(
            Model::parse_or_custom(" glm-9 "),
            Model::Custom("glm-9".to_string())
        );
    }

    #[test]
    fn default_is_glm5() {
        assert_eq!(Model::default().to_string(), "glm-5");
    }
}
