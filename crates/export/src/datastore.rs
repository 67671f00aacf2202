//! Datastore (export destination) configuration.
//!
//! Exported ledgers are written as files of `ledgers_per_file` contiguous
//! ledgers, grouped into partition directories of `files_per_partition`
//! files. The config document keeps backend parameters as a free-form map;
//! [`DataStoreConfig::validate`] checks it and produces the typed
//! [`DataStoreBackend`] for the storage layer.
//!
//! ```toml
//! [datastore_config]
//! type = "GCS"
//!
//! [datastore_config.params]
//! destination_bucket_path = "my-bucket/ledgers/pubnet"
//!
//! [datastore_config.schema]
//! ledgers_per_file = 1
//! files_per_partition = 64000
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Datastore settings as written in the config document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStoreConfig {
    /// Backend kind: `GCS`, `S3` or `FS`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Backend-specific parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// File and partition layout.
    #[serde(default)]
    pub schema: DataStoreSchema,
}

/// How ledgers are grouped into files and files into partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStoreSchema {
    /// Ledgers per datastore file.
    #[serde(default)]
    pub ledgers_per_file: u32,

    /// Files per partition directory.
    #[serde(default)]
    pub files_per_partition: u32,
}

/// A validated datastore backend with its required parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStoreBackend {
    /// Google Cloud Storage.
    Gcs {
        /// `bucket/prefix` that receives the files.
        destination_bucket_path: String,
    },
    /// Amazon S3 or an S3-compatible store.
    S3 {
        /// Bucket (optionally with a prefix).
        bucket_name: String,
        /// Region, when not taken from the environment.
        region: Option<String>,
        /// Custom endpoint for S3-compatible stores.
        endpoint_url: Option<String>,
    },
    /// Local filesystem.
    Filesystem {
        /// Root directory for exported files.
        base_path: PathBuf,
    },
}

impl DataStoreBackend {
    /// The kind name as written in the config document.
    pub fn kind(&self) -> &'static str {
        match self {
            DataStoreBackend::Gcs { .. } => "GCS",
            DataStoreBackend::S3 { .. } => "S3",
            DataStoreBackend::Filesystem { .. } => "FS",
        }
    }
}

impl DataStoreConfig {
    /// Check the configuration and return the typed backend.
    ///
    /// Checks run in order: kind present, kind-specific parameter present
    /// (which also rejects unknown kinds), then both schema fields non-zero.
    pub fn validate(&self) -> Result<DataStoreBackend, ValidationError> {
        if self.kind.is_empty() {
            return Err(ValidationError::MissingKind);
        }

        let backend = match self.kind.as_str() {
            "GCS" => DataStoreBackend::Gcs {
                destination_bucket_path: self.required("destination_bucket_path")?,
            },
            "S3" => DataStoreBackend::S3 {
                bucket_name: self.required("bucket_name")?,
                region: self.params.get("region").cloned(),
                endpoint_url: self.params.get("endpoint_url").cloned(),
            },
            "FS" => DataStoreBackend::Filesystem {
                base_path: PathBuf::from(self.required("base_path")?),
            },
            other => return Err(ValidationError::UnsupportedKind(other.to_string())),
        };

        if self.schema.ledgers_per_file == 0 {
            return Err(ValidationError::InvalidSchema {
                field: "ledgers_per_file",
            });
        }
        if self.schema.files_per_partition == 0 {
            return Err(ValidationError::InvalidSchema {
                field: "files_per_partition",
            });
        }

        Ok(backend)
    }

    /// The raw parameter map, as handed to the storage backend factory.
    pub fn to_params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    fn required(&self, name: &'static str) -> Result<String, ValidationError> {
        self.params
            .get(name)
            .cloned()
            .ok_or_else(|| ValidationError::MissingParameter {
                kind: self.kind.clone(),
                name,
            })
    }
}

impl DataStoreSchema {
    /// Round `seq` down to the first ledger of its file.
    ///
    /// Returns `seq` unchanged when `ledgers_per_file` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use henyey_export::datastore::DataStoreSchema;
    ///
    /// let schema = DataStoreSchema { ledgers_per_file: 10, files_per_partition: 1 };
    /// assert_eq!(schema.start_boundary(23), 20);
    /// assert_eq!(schema.start_boundary(20), 20);
    /// ```
    pub fn start_boundary(&self, seq: u32) -> u32 {
        if self.ledgers_per_file == 0 {
            return seq;
        }
        (seq / self.ledgers_per_file) * self.ledgers_per_file
    }

    /// Round `seq` up to the next file boundary.
    ///
    /// Returns `None` if the boundary does not fit in a `u32`, and `seq`
    /// unchanged when `ledgers_per_file` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use henyey_export::datastore::DataStoreSchema;
    ///
    /// let schema = DataStoreSchema { ledgers_per_file: 10, files_per_partition: 1 };
    /// assert_eq!(schema.end_boundary(57), Some(60));
    /// assert_eq!(schema.end_boundary(60), Some(60));
    /// ```
    pub fn end_boundary(&self, seq: u32) -> Option<u32> {
        if self.ledgers_per_file == 0 {
            return Some(seq);
        }
        seq.checked_next_multiple_of(self.ledgers_per_file)
    }

    /// Ledgers per partition directory.
    pub fn partition_size(&self) -> u64 {
        u64::from(self.ledgers_per_file) * u64::from(self.files_per_partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: &str, params: &[(&str, &str)], lpf: u32, fpp: u32) -> DataStoreConfig {
        DataStoreConfig {
            kind: kind.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            schema: DataStoreSchema {
                ledgers_per_file: lpf,
                files_per_partition: fpp,
            },
        }
    }

    #[test]
    fn test_validate_gcs() {
        let backend = config("GCS", &[("destination_bucket_path", "b/p")], 64, 10)
            .validate()
            .unwrap();
        assert_eq!(
            backend,
            DataStoreBackend::Gcs {
                destination_bucket_path: "b/p".to_string()
            }
        );
        assert_eq!(backend.kind(), "GCS");
    }

    #[test]
    fn test_validate_s3_optional_params() {
        let backend = config(
            "S3",
            &[("bucket_name", "ledgers"), ("region", "us-east-2")],
            1,
            64000,
        )
        .validate()
        .unwrap();
        assert_eq!(
            backend,
            DataStoreBackend::S3 {
                bucket_name: "ledgers".to_string(),
                region: Some("us-east-2".to_string()),
                endpoint_url: None,
            }
        );
    }

    #[test]
    fn test_validate_fs() {
        let backend = config("FS", &[("base_path", "/data")], 1, 1).validate().unwrap();
        assert_eq!(
            backend,
            DataStoreBackend::Filesystem {
                base_path: PathBuf::from("/data")
            }
        );
    }

    #[test]
    fn test_missing_kind() {
        assert_eq!(
            config("", &[], 1, 1).validate(),
            Err(ValidationError::MissingKind)
        );
    }

    #[test]
    fn test_missing_parameter_per_kind() {
        for (kind, name) in [
            ("GCS", "destination_bucket_path"),
            ("S3", "bucket_name"),
            ("FS", "base_path"),
        ] {
            assert_eq!(
                config(kind, &[("unrelated", "x")], 1, 1).validate(),
                Err(ValidationError::MissingParameter {
                    kind: kind.to_string(),
                    name
                })
            );
        }
    }

    #[test]
    fn test_unsupported_kind() {
        assert_eq!(
            config("AZURE", &[("container", "c")], 1, 1).validate(),
            Err(ValidationError::UnsupportedKind("AZURE".to_string()))
        );
    }

    #[test]
    fn test_kind_is_case_sensitive() {
        assert!(matches!(
            config("gcs", &[("destination_bucket_path", "b")], 1, 1).validate(),
            Err(ValidationError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_invalid_schema() {
        let params = [("base_path", "/data")];
        assert_eq!(
            config("FS", &params, 0, 1).validate(),
            Err(ValidationError::InvalidSchema {
                field: "ledgers_per_file"
            })
        );
        assert_eq!(
            config("FS", &params, 1, 0).validate(),
            Err(ValidationError::InvalidSchema {
                field: "files_per_partition"
            })
        );
    }

    #[test]
    fn test_parameter_checked_before_schema() {
        assert!(matches!(
            config("GCS", &[], 0, 0).validate(),
            Err(ValidationError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_boundaries() {
        let schema = DataStoreSchema {
            ledgers_per_file: 64,
            files_per_partition: 10,
        };
        assert_eq!(schema.start_boundary(5), 0);
        assert_eq!(schema.start_boundary(64), 64);
        assert_eq!(schema.start_boundary(127), 64);
        assert_eq!(schema.end_boundary(1), Some(64));
        assert_eq!(schema.end_boundary(64), Some(64));
        assert_eq!(schema.end_boundary(65), Some(128));
        assert_eq!(schema.end_boundary(u32::MAX), None);
        assert_eq!(schema.partition_size(), 640);
    }

    #[test]
    fn test_single_ledger_files_are_identity() {
        let schema = DataStoreSchema {
            ledgers_per_file: 1,
            files_per_partition: 64000,
        };
        for seq in [2, 3, 1000, u32::MAX] {
            assert_eq!(schema.start_boundary(seq), seq);
            assert_eq!(schema.end_boundary(seq), Some(seq));
        }
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: DataStoreConfig = toml::from_str(
            r#"
            type = "S3"
            [params]
            bucket_name = "ledgers"
            [schema]
            ledgers_per_file = 8
            files_per_partition = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.kind, "S3");
        assert_eq!(config.to_params().get("bucket_name").unwrap(), "ledgers");
        assert_eq!(config.schema.ledgers_per_file, 8);
    }
}
