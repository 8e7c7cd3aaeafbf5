//! Error taxonomy for snapsync.

use crate::code::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Result type alias for operations that fail with a known error.
pub type Result<T> = std::result::Result<T, KnownError>;

/// HTTP status reported for a failure that does not choose its own.
pub const DEFAULT_HTTP_STATUS: u16 = 500;

/// Message shown to users for failures nothing classified.
pub const GENERIC_MESSAGE: &str =
    "An unexpected error occurred.  Please check the supervisor logs for details.";

/// A failure that can be explained to a user or an API client.
///
/// Implementors only have to name their [`ErrorCode`]; the message comes
/// from `Display`, and the HTTP status and data payload have defaults.
pub trait Explain: std::error::Error {
    /// Stable machine-readable identifier.
    fn code(&self) -> ErrorCode;

    /// Human-readable explanation.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Status used when the failure crosses an HTTP boundary.
    fn http_status(&self) -> u16 {
        DEFAULT_HTTP_STATUS
    }

    /// Machine-readable details supplementing the message.
    fn data(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Render the failure as a response body.
    fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.message(),
            http_status: self.http_status(),
            data: self.data(),
        }
    }
}

/// Every failure snapsync recognizes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnownError {
    /// Injected failure for testing and debugging.
    #[error("Gave code {0}")]
    Simulated(ErrorCode),

    /// Internal logic fault.
    #[error("{0}")]
    Logic(String),

    /// A required field was missing from data returned by an API.
    #[error("{}", protocol_message(.parameter, .object_name.as_deref()))]
    Protocol {
        parameter: String,
        object_name: Option<String>,
        /// The offending container, kept for debugging only.
        debug_object: Option<Value>,
    },

    #[error("A snapshot is already in progress")]
    SnapshotInProgress,

    #[error(
        "Couldn't find your snapshot password in your secrets file.  Please check your settings."
    )]
    SnapshotPasswordKeyInvalid,

    #[error("Snapshot upload failed.  Please check the supervisor logs for details.")]
    UploadFailed,

    #[error(
        "Your Google Drive credentials have expired.  Please reauthorize with Google Drive through the Web UI."
    )]
    GoogleCredentialsExpired,

    #[error("The snapshot doesn't exist anymore")]
    NoSnapshot,

    #[error("This snapshot can't be uploaded to Home Assistant yet")]
    NotUploadable,

    #[error("Please wait until the sync is finished.")]
    PleaseWait,

    #[error("'{current}' isn't a valid value for {key}")]
    InvalidConfigurationValue { key: String, current: String },

    /// More than one old snapshot would be deleted; keyed by snapshot source.
    #[error(
        "The add-on has been configured to delete more than one older snapshots.  Please confirm this by visiting the add-on's web UI or by setting the config option 'confirm_multiple_deletes'=false in your add-on configuration."
    )]
    DeleteMultipleSnapshots { delete_sources: Map<String, Value> },

    #[error("Google Drive is out of space")]
    DriveQuotaExceeded,

    #[error("Unable to resolve host www.googleapis.com")]
    GoogleDnsFailure,

    #[error("Unable to connect to www.googleapis.com")]
    GoogleCantConnect,

    #[error("Google Drive returned an internal error (HTTP: 5XX)")]
    GoogleInternalError,

    #[error("Timed out while trying to reach Google Drive")]
    GoogleTimeout,

    #[error("Upload session with Google Drive expired.  The upload could not complete.")]
    GoogleSessionExpired,

    #[error("Home Assistant refused to delete the snapshot.")]
    HomeAssistantDelete,

    #[error(
        "A backup folder already exists.  Please visit the add-on Web UI to select where to backup."
    )]
    ExistingBackupFolder { existing_id: String },

    #[error(
        "Multiple backup folders were found.  Please visit the add-on Web UI to select where to backup."
    )]
    MultipleBackupFolders { count: usize },

    #[error(
        "The backup folder is missing.  Please visit the add-on Web UI to select where to backup."
    )]
    BackupFolderMissing,
}

fn protocol_message(parameter: &str, object_name: Option<&str>) -> String {
    match object_name {
        Some(name) => format!("Required key '{parameter}' was missing from {name}"),
        None => parameter.to_string(),
    }
}

impl KnownError {
    /// Build a protocol error for a key missing from `object_name`.
    #[must_use]
    pub fn protocol(parameter: impl Into<String>, object_name: Option<&str>) -> Self {
        Self::Protocol {
            parameter: parameter.into(),
            object_name: object_name.map(str::to_string),
            debug_object: None,
        }
    }

    /// Attach the container that triggered a protocol error.
    #[must_use]
    pub fn with_debug_object(self, object: Value) -> Self {
        match self {
            Self::Protocol {
                parameter,
                object_name,
                ..
            } => Self::Protocol {
                parameter,
                object_name,
                debug_object: Some(object),
            },
            other => other,
        }
    }

    /// Build a configuration error for `key` holding `current`.
    #[must_use]
    pub fn invalid_config(key: impl Into<String>, current: impl ToString) -> Self {
        Self::InvalidConfigurationValue {
            key: key.into(),
            current: current.to_string(),
        }
    }
}

impl Explain for KnownError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Simulated(code) => *code,
            Self::Logic(_) => ErrorCode::Logic,
            Self::Protocol { .. } => ErrorCode::Protocol,
            Self::SnapshotInProgress => ErrorCode::SnapshotInProgress,
            Self::SnapshotPasswordKeyInvalid => ErrorCode::PasswordKeyInvalid,
            Self::UploadFailed => ErrorCode::UploadFailed,
            Self::GoogleCredentialsExpired => ErrorCode::CredsExpired,
            Self::NoSnapshot => ErrorCode::NoSnapshot,
            Self::NotUploadable => ErrorCode::NotUploadable,
            Self::PleaseWait => ErrorCode::PleaseWait,
            Self::InvalidConfigurationValue { .. } => ErrorCode::InvalidConfig,
            Self::DeleteMultipleSnapshots { .. } => ErrorCode::MultipleDeletes,
            Self::DriveQuotaExceeded => ErrorCode::DriveFull,
            Self::GoogleDnsFailure => ErrorCode::GoogleDns,
            Self::GoogleCantConnect => ErrorCode::GoogleConnect,
            Self::GoogleInternalError => ErrorCode::GoogleInternal,
            Self::GoogleTimeout => ErrorCode::GoogleTimeout,
            Self::GoogleSessionExpired => ErrorCode::GoogleSession,
            Self::HomeAssistantDelete => ErrorCode::HaDelete,
            Self::ExistingBackupFolder { .. } => ErrorCode::ExistingFolder,
            Self::MultipleBackupFolders { .. } => ErrorCode::MultipleFolders,
            Self::BackupFolderMissing => ErrorCode::BackupFolderMissing,
        }
    }

    fn data(&self) -> Value {
        match self {
            Self::DeleteMultipleSnapshots { delete_sources } => {
                Value::Object(delete_sources.clone())
            }
            Self::ExistingBackupFolder { existing_id } => json!({ "existing_id": existing_id }),
            Self::MultipleBackupFolders { count } => json!({ "count": count }),
            _ => Value::Object(Map::new()),
        }
    }
}

/// JSON body describing a failure to an API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub http_status: u16,
    #[serde(default)]
    pub data: Value,
}

impl ErrorBody {
    /// Body for a failure with no stable code. Details stay in the logs.
    #[must_use]
    pub fn generic() -> Self {
        Self {
            code: ErrorCode::Generic,
            message: GENERIC_MESSAGE.to_string(),
            http_status: DEFAULT_HTTP_STATUS,
            data: Value::Object(Map::new()),
        }
    }
}

impl From<&KnownError> for ErrorBody {
    fn from(err: &KnownError) -> Self {
        err.to_body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn every_variant() -> Vec<KnownError> {
        vec![
            KnownError::Logic("broken".to_string()),
            KnownError::protocol("slug", Some("snapshot")),
            KnownError::SnapshotInProgress,
            KnownError::SnapshotPasswordKeyInvalid,
            KnownError::UploadFailed,
            KnownError::GoogleCredentialsExpired,
            KnownError::NoSnapshot,
            KnownError::NotUploadable,
            KnownError::PleaseWait,
            KnownError::invalid_config("max_snapshots", -1),
            KnownError::DeleteMultipleSnapshots {
                delete_sources: Map::new(),
            },
            KnownError::DriveQuotaExceeded,
            KnownError::GoogleDnsFailure,
            KnownError::GoogleCantConnect,
            KnownError::GoogleInternalError,
            KnownError::GoogleTimeout,
            KnownError::GoogleSessionExpired,
            KnownError::HomeAssistantDelete,
            KnownError::ExistingBackupFolder {
                existing_id: "abc".to_string(),
            },
            KnownError::MultipleBackupFolders { count: 2 },
            KnownError::BackupFolderMissing,
        ]
    }

    #[test]
    fn test_codes_distinct_across_variants() {
        let variants = every_variant();
        let codes: HashSet<_> = variants.iter().map(Explain::code).collect();
        assert_eq!(codes.len(), variants.len());
        assert!(!codes.contains(&ErrorCode::Generic));
    }

    #[test]
    fn test_codes_stable_across_calls() {
        for err in every_variant() {
            assert_eq!(err.code(), err.code());
            assert_eq!(err.code().as_str(), err.clone().code().as_str());
        }
    }

    #[test]
    fn test_default_http_status() {
        for err in every_variant() {
            assert_eq!(err.http_status(), 500);
        }
        assert_eq!(
            KnownError::Simulated(ErrorCode::GoogleDns).http_status(),
            500
        );
    }

    #[test]
    fn test_default_data_is_empty_object() {
        assert_eq!(KnownError::UploadFailed.data(), json!({}));
        assert_eq!(KnownError::protocol("x", None).data(), json!({}));
    }

    #[test]
    fn test_simulated_error() {
        let err = KnownError::Simulated(ErrorCode::GoogleTimeout);
        assert_eq!(err.code(), ErrorCode::GoogleTimeout);
        assert_eq!(err.message(), "Gave code google_timeout");
    }

    #[test]
    fn test_protocol_message() {
        let err = KnownError::protocol("slug", Some("snapshot"));
        assert_eq!(err.message(), "Required key 'slug' was missing from snapshot");

        let bare = KnownError::protocol("slug", None);
        assert_eq!(bare.message(), "slug");
    }

    #[test]
    fn test_debug_object_not_surfaced() {
        let err = KnownError::protocol("slug", Some("snapshot"))
            .with_debug_object(json!({"name": "secret-ish"}));
        assert!(!err.message().contains("secret-ish"));
        assert_eq!(err.data(), json!({}));
        match err {
            KnownError::Protocol { debug_object, .. } => {
                assert_eq!(debug_object, Some(json!({"name": "secret-ish"})));
            }
            other => panic!("Expected Protocol, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_message() {
        let err = KnownError::invalid_config("days_between_snapshots", 0);
        assert_eq!(
            err.message(),
            "'0' isn't a valid value for days_between_snapshots"
        );
        assert_eq!(err.code(), ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_payload_data() {
        assert_eq!(
            KnownError::ExistingBackupFolder {
                existing_id: "folder-1".to_string()
            }
            .data(),
            json!({"existing_id": "folder-1"})
        );
        assert_eq!(
            KnownError::MultipleBackupFolders { count: 3 }.data(),
            json!({"count": 3})
        );

        let mut sources = Map::new();
        sources.insert("GoogleDrive".to_string(), json!(["Full Snapshot 1"]));
        let err = KnownError::DeleteMultipleSnapshots {
            delete_sources: sources,
        };
        assert_eq!(err.data(), json!({"GoogleDrive": ["Full Snapshot 1"]}));
    }

    #[test]
    fn test_body_serialization() {
        let body = KnownError::MultipleBackupFolders { count: 2 }.to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            json!({
                "code": "multiple_backup_folders",
                "message": "Multiple backup folders were found.  Please visit the add-on Web UI to select where to backup.",
                "http_status": 500,
                "data": {"count": 2}
            })
        );
    }

    #[test]
    fn test_generic_body() {
        let body = ErrorBody::generic();
        assert_eq!(body.code, ErrorCode::Generic);
        assert_eq!(body.http_status, 500);
        assert_eq!(body.data, json!({}));
    }
}
