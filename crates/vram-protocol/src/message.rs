use serde::{Deserialize, Serialize};
use vram_store::{
    ResourceRecord, ResourceSummary, StorageStats, DEFAULT_PRIORITY, DEFAULT_RESOURCE_TYPE,
};
use vram_types::{ContentDigest, ResourceId};

use crate::error::ProtocolError;

/// Body of a store request as submitted by clients.
///
/// `resource_id` and `data` are optional here so that their absence is
/// reported as a validation error rather than a parse failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Base64-encoded payload.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(rename = "type", default = "default_type")]
    pub resource_type: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_type() -> String {
    DEFAULT_RESOURCE_TYPE.to_string()
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

fn default_compress() -> bool {
    true
}

impl StoreRequest {
    /// Request with default options.
    pub fn new(resource_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            data: Some(data.into()),
            resource_type: default_type(),
            priority: default_priority(),
            compress: default_compress(),
        }
    }

    /// Parse a JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(body)
            .map_err(|e| ProtocolError::Validation(format!("Invalid request body: {e}")))
    }
}

/// One operation of the resource contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiRequest {
    List { type_filter: Option<String> },
    Get { id: String },
    Info { id: String },
    Version { id: String },
    Store(StoreRequest),
    Delete { id: String },
    Stats,
}

impl ApiRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Get { .. } => "get",
            Self::Info { .. } => "info",
            Self::Version { .. } => "version",
            Self::Store(_) => "store",
            Self::Delete { .. } => "delete",
            Self::Stats => "stats",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Operation-specific part of a response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    List {
        resources: Vec<ResourceSummary>,
        count: usize,
    },
    /// Payload inlined as base64.
    Inline {
        resource_id: ResourceId,
        data: String,
        encoding: &'static str,
        metadata: ResourceRecord,
    },
    /// Payload too large to inline; fetch it from `download_url`.
    Download {
        resource_id: ResourceId,
        download_url: String,
        metadata: ResourceRecord,
    },
    Info {
        resource_id: ResourceId,
        metadata: ResourceRecord,
        version: u64,
    },
    Version {
        resource_id: ResourceId,
        version: u64,
    },
    Stored {
        resource_id: ResourceId,
        size: u64,
        compressed_size: u64,
        version: u64,
        hash: ContentDigest,
    },
    Deleted {
        resource_id: ResourceId,
        deleted: bool,
        message: String,
    },
    Stats {
        stats: StorageStats,
        timestamp: String,
    },
    Error {
        message: String,
    },
}

/// A complete response: status, body, and the code a transport should use.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: Status,
    #[serde(skip)]
    pub code: u16,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn success(body: ResponseBody) -> Self {
        Self {
            status: Status::Success,
            code: 200,
            body,
        }
    }

    pub fn from_error(err: &ProtocolError) -> Self {
        Self {
            status: Status::Error,
            code: err.status_code(),
            body: ResponseBody::Error {
                message: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "status": "error", "message": e.to_string() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_request_defaults() {
        let req = StoreRequest::from_json(br#"{"resource_id": "a", "data": "aGk="}"#).unwrap();
        assert_eq!(req.resource_id.as_deref(), Some("a"));
        assert_eq!(req.resource_type, "generic");
        assert_eq!(req.priority, 1);
        assert!(req.compress);
    }

    #[test]
    fn store_request_explicit_fields() {
        let req = StoreRequest::from_json(
            br#"{"resource_id": "a", "data": "", "type": "json", "priority": 3, "compress": false}"#,
        )
        .unwrap();
        assert_eq!(req.resource_type, "json");
        assert_eq!(req.priority, 3);
        assert!(!req.compress);
    }

    #[test]
    fn store_request_missing_fields_parse() {
        let req = StoreRequest::from_json(b"{}").unwrap();
        assert!(req.resource_id.is_none());
        assert!(req.data.is_none());
    }

    #[test]
    fn store_request_bad_json_is_validation() {
        let err = StoreRequest::from_json(b"not json").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn error_response_shape() {
        let resp = ApiResponse::from_error(&ProtocolError::Validation("Missing required fields".into()));
        assert!(!resp.is_success());
        assert_eq!(resp.code, 400);
        let json = resp.to_json();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Missing required fields");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn version_response_shape() {
        let resp = ApiResponse::success(ResponseBody::Version {
            resource_id: ResourceId::new("a").unwrap(),
            version: 4,
        });
        let json = resp.to_json();
        assert_eq!(json, serde_json::json!({"status": "success", "resource_id": "a", "version": 4}));
    }

    #[test]
    fn request_names() {
        assert_eq!(ApiRequest::Stats.name(), "stats");
        assert_eq!(ApiRequest::Get { id: "x".into() }.name(), "get");
    }
}
