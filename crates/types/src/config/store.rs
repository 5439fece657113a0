//! Entity store configuration: resource naming, bucket layout and index behavior.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration for an indexed entity store.
///
/// # Validation Rules
///
/// - `resource` must be non-empty
/// - `entity_bucket` and `index_bucket` must be non-empty and distinct
///
/// # Example
///
/// ```no_run
/// # use entkv_types::config::StoreConfig;
/// let config = StoreConfig::builder()
///     .resource("dashboard")
///     .entity_bucket("dashboardsv2")
///     .index_bucket("dashboardindexv2")
///     .build()
///     .expect("valid store config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoreConfig {
    /// Resource name used in error messages and tracing fields.
    pub resource: String,
    /// Bucket holding the serialized entities, keyed by id.
    pub entity_bucket: String,
    /// Bucket holding the organization/name index.
    pub index_bucket: String,
    /// Whether names are matched case-sensitively by the index.
    ///
    /// Defaults to `false`: names are lower-cased before being indexed.
    #[serde(default)]
    pub case_sensitive_names: bool,
}

#[bon::bon]
impl StoreConfig {
    /// Creates a new store configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if:
    /// - `resource` is empty
    /// - either bucket name is empty
    /// - both bucket names are equal
    #[builder]
    pub fn new(
        #[builder(into)] resource: String,
        #[builder(into)] entity_bucket: String,
        #[builder(into)] index_bucket: String,
        #[builder(default)] case_sensitive_names: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self { resource, entity_bucket, index_bucket, case_sensitive_names };
        config.validate()?;
        Ok(config)
    }
}

impl StoreConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure values are within valid ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource.is_empty() {
            return Err(ConfigError::Validation {
                message: "resource must not be empty".to_string(),
            });
        }
        if self.entity_bucket.is_empty() || self.index_bucket.is_empty() {
            return Err(ConfigError::Validation {
                message: format!(
                    "bucket names for {} must not be empty (entity: {:?}, index: {:?})",
                    self.resource, self.entity_bucket, self.index_bucket
                ),
            });
        }
        if self.entity_bucket == self.index_bucket {
            return Err(ConfigError::Validation {
                message: format!(
                    "entity and index buckets for {} must differ, both are {:?}",
                    self.resource, self.entity_bucket
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_case_insensitive() {
        let config = StoreConfig::builder()
            .resource("foo")
            .entity_bucket("foo_ent")
            .index_bucket("foo_idx")
            .build()
            .expect("valid config");
        assert!(!config.case_sensitive_names);
        assert_eq!(config.resource, "foo");
    }

    #[test]
    fn test_builder_rejects_empty_resource() {
        let err = StoreConfig::builder()
            .resource("")
            .entity_bucket("foo_ent")
            .index_bucket("foo_idx")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("resource must not be empty"));
    }

    #[test]
    fn test_builder_rejects_shared_bucket() {
        let err = StoreConfig::builder()
            .resource("foo")
            .entity_bucket("foo")
            .index_bucket("foo")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_deserialize_then_validate() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"resource":"bucket","entity_bucket":"bucketsv1","index_bucket":"bucketindexv1"}"#,
        )
        .expect("deserialize");
        assert!(!config.case_sensitive_names);
        config.validate().expect("valid after deserialize");

        let bad: StoreConfig = serde_json::from_str(
            r#"{"resource":"bucket","entity_bucket":"","index_bucket":"bucketindexv1"}"#,
        )
        .expect("deserialize");
        assert!(bad.validate().is_err());
    }
}
