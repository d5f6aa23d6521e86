//! Configuration of the foreign estimator ecosystem.
//!
//! [`EcosystemConfig`] describes where the foreign side keeps the facilities
//! the protocol relies on: the module probed for availability, the module
//! holding `clone`/`is_classifier`, the attribute names read by the derived
//! queries, and where users find installation instructions.
//!
//! The configuration is handed to a [`ForeignRuntime`](crate::ForeignRuntime)
//! when it is created and never mutated afterwards.
//!
//! # Example
//!
//! ```
//! use lex_estimator::EcosystemConfig;
//!
//! let config = EcosystemConfig::builder()
//!     .root_module("sklearn")
//!     .base_module("sklearn.base")
//!     .clone_safe(true)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.base_module, "sklearn.base");
//! ```

use crate::error::EstimatorError;
use serde::{Deserialize, Serialize};

/// Description of a foreign estimator ecosystem.
///
/// Use [`EcosystemConfig::builder()`] to construct one; the defaults describe
/// scikit-learn.
///
/// # Validation
///
/// [`build()`](EcosystemConfigBuilder::build) rejects:
/// - empty names, URLs or attribute names
/// - module paths with empty segments (`"sklearn..base"`, `".base"`)
/// - a `base_module` that does not live under `root_module`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcosystemConfig {
    /// Human-readable ecosystem name used in error messages.
    pub name: String,

    /// Top-level module imported to check that the ecosystem is installed.
    pub root_module: String,

    /// Module that provides `clone` and `is_classifier`.
    pub base_module: String,

    /// Where users can find installation instructions.
    pub install_url: String,

    /// Value of the `safe` keyword passed to the foreign `clone`.
    pub clone_safe: bool,

    /// Attribute holding the classes discovered during `fit`.
    pub classes_attr: String,

    /// Attribute holding learned components.
    pub components_attr: String,

    /// Attribute flagging estimators that expect pairwise input.
    pub pairwise_attr: String,
}

impl Default for EcosystemConfig {
    fn default() -> Self {
        Self {
            name: "scikit-learn".to_string(),
            root_module: "sklearn".to_string(),
            base_module: "sklearn.base".to_string(),
            install_url: "https://scikit-learn.org/stable/install.html".to_string(),
            clone_safe: true,
            classes_attr: "classes_".to_string(),
            components_attr: "components_".to_string(),
            pairwise_attr: "_pairwise".to_string(),
        }
    }
}

impl EcosystemConfig {
    /// Create a new builder for `EcosystemConfig`.
    #[must_use]
    pub fn builder() -> EcosystemConfigBuilder {
        EcosystemConfigBuilder::default()
    }

    /// A builder starting from this configuration, e.g. to validate it.
    #[must_use]
    pub fn into_builder(self) -> EcosystemConfigBuilder {
        EcosystemConfigBuilder { config: self }
    }

    /// Parse a configuration from a JSON document and validate it.
    ///
    /// Missing fields take their default value.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::Json`] for malformed JSON and
    /// [`EstimatorError::InvalidConfig`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, EstimatorError> {
        let config: EcosystemConfig = serde_json::from_str(json)?;
        config.into_builder().build()
    }
}

/// Builder for [`EcosystemConfig`].
#[derive(Debug, Clone, Default)]
pub struct EcosystemConfigBuilder {
    config: EcosystemConfig,
}

impl EcosystemConfigBuilder {
    /// Set the ecosystem name shown in messages.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the module probed for availability.
    #[must_use]
    pub fn root_module(mut self, module: impl Into<String>) -> Self {
        self.config.root_module = module.into();
        self
    }

    /// Set the module that provides `clone` and `is_classifier`.
    #[must_use]
    pub fn base_module(mut self, module: impl Into<String>) -> Self {
        self.config.base_module = module.into();
        self
    }

    /// Set the installation instructions URL.
    #[must_use]
    pub fn install_url(mut self, url: impl Into<String>) -> Self {
        self.config.install_url = url.into();
        self
    }

    /// Set the `safe` flag forwarded to the foreign `clone` (default: true).
    #[must_use]
    pub fn clone_safe(mut self, safe: bool) -> Self {
        self.config.clone_safe = safe;
        self
    }

    /// Set the attribute read by `get_classes` (default: `classes_`).
    #[must_use]
    pub fn classes_attr(mut self, attr: impl Into<String>) -> Self {
        self.config.classes_attr = attr.into();
        self
    }

    /// Set the attribute read by `get_components` (default: `components_`).
    #[must_use]
    pub fn components_attr(mut self, attr: impl Into<String>) -> Self {
        self.config.components_attr = attr.into();
        self
    }

    /// Set the attribute read by `is_pairwise` (default: `_pairwise`).
    #[must_use]
    pub fn pairwise_attr(mut self, attr: impl Into<String>) -> Self {
        self.config.pairwise_attr = attr.into();
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::InvalidConfig`] naming the offending field.
    pub fn build(self) -> Result<EcosystemConfig, EstimatorError> {
        let config = self.config;

        for (field, value) in [
            ("name", &config.name),
            ("install_url", &config.install_url),
            ("classes_attr", &config.classes_attr),
            ("components_attr", &config.components_attr),
            ("pairwise_attr", &config.pairwise_attr),
        ] {
            if value.trim().is_empty() {
                return Err(EstimatorError::InvalidConfig(format!(
                    "{field} must not be empty"
                )));
            }
        }

        validate_module_path("root_module", &config.root_module)?;
        validate_module_path("base_module", &config.base_module)?;

        if config.base_module != config.root_module
            && !config
                .base_module
                .starts_with(&format!("{}.", config.root_module))
        {
            return Err(EstimatorError::InvalidConfig(format!(
                "base_module '{}' must be inside root_module '{}'",
                config.base_module, config.root_module
            )));
        }

        Ok(config)
    }
}

fn validate_module_path(field: &str, path: &str) -> Result<(), EstimatorError> {
    if path.is_empty() || path.split('.').any(|segment| segment.trim().is_empty()) {
        return Err(EstimatorError::InvalidConfig(format!(
            "{field} must be a dotted module path, got '{path}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_describes_sklearn() {
        let config = EcosystemConfig::default();
        assert_eq!(config.root_module, "sklearn");
        assert_eq!(config.base_module, "sklearn.base");
        assert!(config.clone_safe);
        assert_eq!(config.classes_attr, "classes_");
        assert_eq!(config.pairwise_attr, "_pairwise");
    }

    #[test]
    fn test_builder_defaults_are_valid() {
        assert!(EcosystemConfig::builder().build().is_ok());
    }

    #[test]
    fn test_invalid_module_paths() {
        let result = EcosystemConfig::builder().root_module("").build();
        assert!(result.unwrap_err().to_string().contains("root_module"));

        let result = EcosystemConfig::builder().base_module("sklearn..base").build();
        assert!(result.unwrap_err().to_string().contains("base_module"));

        let result = EcosystemConfig::builder().base_module(".base").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_base_module_must_be_under_root() {
        let result = EcosystemConfig::builder()
            .root_module("sklearn")
            .base_module("skl.base")
            .build();
        assert!(result.unwrap_err().to_string().contains("inside root_module"));
    }

    #[test]
    fn test_empty_attribute_rejected() {
        let result = EcosystemConfig::builder().classes_attr(" ").build();
        assert!(result.unwrap_err().to_string().contains("classes_attr"));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            EcosystemConfig::from_json_str(r#"{"name": "sk", "clone_safe": false}"#).unwrap();
        assert_eq!(config.name, "sk");
        assert!(!config.clone_safe);
        assert_eq!(config.base_module, "sklearn.base");
    }

    #[test]
    fn test_from_json_validates() {
        let result = EcosystemConfig::from_json_str(r#"{"base_module": "other.base"}"#);
        assert!(matches!(result, Err(EstimatorError::InvalidConfig(_))));

        let result = EcosystemConfig::from_json_str("not json");
        assert!(matches!(result, Err(EstimatorError::Json(_))));
    }
}
