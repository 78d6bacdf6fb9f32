use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vram_store::{ResourceStore, StoreError, StoreOptions};
use vram_types::ResourceId;

use crate::encoding::{decode_payload, encode_payload, PAYLOAD_ENCODING};
use crate::endpoint::endpoints;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{ApiRequest, ApiResponse, ResponseBody, StoreRequest};

/// Transport-facing settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Largest payload returned inline by `get`; larger ones get a download URL.
    pub inline_limit: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            inline_limit: 1024 * 1024,
        }
    }
}

/// Run one request against `store`. Every failure becomes an error response.
pub fn dispatch(
    store: &dyn ResourceStore,
    config: &ProtocolConfig,
    request: ApiRequest,
) -> ApiResponse {
    let name = request.name();
    match handle(store, config, request) {
        Ok(body) => {
            debug!(operation = name, "request succeeded");
            ApiResponse::success(body)
        }
        Err(err) => {
            warn!(operation = name, error = %err, "request failed");
            ApiResponse::from_error(&err)
        }
    }
}

fn parse_id(id: &str) -> ProtocolResult<ResourceId> {
    Ok(ResourceId::new(id)?)
}

fn handle(
    store: &dyn ResourceStore,
    config: &ProtocolConfig,
    request: ApiRequest,
) -> ProtocolResult<ResponseBody> {
    match request {
        ApiRequest::List { type_filter } => {
            let resources = store.list(type_filter.as_deref())?;
            Ok(ResponseBody::List {
                count: resources.len(),
                resources,
            })
        }
        ApiRequest::Get { id } => {
            let fetched = store.get(&parse_id(&id)?)?;
            if fetched.data.len() <= config.inline_limit {
                Ok(ResponseBody::Inline {
                    data: encode_payload(&fetched.data),
                    encoding: PAYLOAD_ENCODING,
                    metadata: fetched.record,
                    resource_id: fetched.id,
                })
            } else {
                Ok(ResponseBody::Download {
                    download_url: endpoints::resource_path(
                        endpoints::RESOURCE_DOWNLOAD,
                        fetched.id.as_str(),
                    ),
                    metadata: fetched.record,
                    resource_id: fetched.id,
                })
            }
        }
        ApiRequest::Info { id } => {
            let info = store.info(&parse_id(&id)?)?;
            Ok(ResponseBody::Info {
                resource_id: info.resource_id,
                metadata: info.metadata,
                version: info.version,
            })
        }
        ApiRequest::Version { id } => {
            let id = parse_id(&id)?;
            let version = store.check_version(&id)?;
            Ok(ResponseBody::Version {
                resource_id: id,
                version,
            })
        }
        ApiRequest::Store(req) => handle_store(store, req),
        ApiRequest::Delete { id } => {
            let id = parse_id(&id)?;
            if !store.delete(&id)? {
                return Err(StoreError::NotFound(id).into());
            }
            Ok(ResponseBody::Deleted {
                message: format!("Resource {id} deleted"),
                deleted: true,
                resource_id: id,
            })
        }
        ApiRequest::Stats => Ok(ResponseBody::Stats {
            stats: store.stats()?,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }),
    }
}

fn handle_store(store: &dyn ResourceStore, req: StoreRequest) -> ProtocolResult<ResponseBody> {
    let (Some(raw_id), Some(encoded)) = (req.resource_id, req.data) else {
        return Err(ProtocolError::Validation("Missing required fields".into()));
    };
    let id = parse_id(&raw_id)?;
    let data = decode_payload(&encoded)?;
    let options = StoreOptions {
        resource_type: req.resource_type,
        priority: req.priority,
        compress: req.compress,
    };

    let receipt = store.store(&id, &data, &options)?;
    Ok(ResponseBody::Stored {
        resource_id: receipt.resource_id,
        size: receipt.size,
        compressed_size: receipt.compressed_size,
        version: receipt.version,
        hash: receipt.hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vram_store::{ResourceManager, StoreConfig};

    fn open(dir: &std::path::Path) -> ResourceManager {
        let mut config = StoreConfig::with_resources_dir(dir);
        config.sync_writes = false;
        ResourceManager::open(config).unwrap()
    }

    fn store_req(id: &str, data: &[u8]) -> ApiRequest {
        ApiRequest::Store(StoreRequest::new(id, encode_payload(data)))
    }

    #[test]
    fn store_then_get_inline() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let cfg = ProtocolConfig::default();

        let resp = dispatch(&store, &cfg, store_req("a", b"hello world"));
        assert!(resp.is_success());
        let json = resp.to_json();
        assert_eq!(json["size"], 11);
        assert_eq!(json["version"], 1);
        assert_eq!(
            json["hash"],
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );

        let resp = dispatch(&store, &cfg, ApiRequest::Get { id: "a".into() });
        let json = resp.to_json();
        assert_eq!(json["status"], "success");
        assert_eq!(json["encoding"], "base64");
        assert_eq!(decode_payload(json["data"].as_str().unwrap()).unwrap(), b"hello world");
        assert_eq!(json["metadata"]["access_count"], 1);
    }

    #[test]
    fn large_payload_gets_download_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let cfg = ProtocolConfig { inline_limit: 4 };
        dispatch(&store, &cfg, store_req("big", b"more than four bytes"));

        let json = dispatch(&store, &cfg, ApiRequest::Get { id: "big".into() }).to_json();
        assert_eq!(json["download_url"], "/api/resources/big/download");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn missing_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let mut req = StoreRequest::new("a", "aGk=");
        req.data = None;
        let resp = dispatch(&store, &ProtocolConfig::default(), ApiRequest::Store(req));
        assert_eq!(resp.code, 400);
        assert_eq!(resp.to_json()["message"], "Missing required fields");
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let req = StoreRequest::new("a", "%%%");
        let resp = dispatch(&store, &ProtocolConfig::default(), ApiRequest::Store(req));
        assert_eq!(resp.code, 400);
        assert!(store.check_version(&ResourceId::new("a").unwrap()).is_err());
    }

    #[test]
    fn invalid_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let resp = dispatch(&store, &ProtocolConfig::default(), store_req("../escape", b"x"));
        assert_eq!(resp.code, 400);
        let resp = dispatch(&store, &ProtocolConfig::default(), ApiRequest::Get { id: "".into() });
        assert_eq!(resp.code, 400);
    }

    #[test]
    fn unknown_ids_are_404() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let cfg = ProtocolConfig::default();
        for req in [
            ApiRequest::Get { id: "nope".into() },
            ApiRequest::Info { id: "nope".into() },
            ApiRequest::Version { id: "nope".into() },
            ApiRequest::Delete { id: "nope".into() },
        ] {
            let resp = dispatch(&store, &cfg, req);
            assert_eq!(resp.code, 404);
            assert_eq!(resp.to_json()["status"], "error");
        }
    }

    #[test]
    fn info_version_delete_list_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let cfg = ProtocolConfig::default();
        dispatch(&store, &cfg, store_req("a", b"one"));
        dispatch(&store, &cfg, store_req("a", b"two"));
        let mut req = StoreRequest::new("b", encode_payload(b"bee"));
        req.resource_type = "binary".into();
        dispatch(&store, &cfg, ApiRequest::Store(req));

        let info = dispatch(&store, &cfg, ApiRequest::Info { id: "a".into() }).to_json();
        assert_eq!(info["version"], 2);
        assert_eq!(info["metadata"]["type"], "generic");
        assert_eq!(info["metadata"]["access_count"], 0);

        let version = dispatch(&store, &cfg, ApiRequest::Version { id: "a".into() }).to_json();
        assert_eq!(version["version"], 2);

        let list = dispatch(
            &store,
            &cfg,
            ApiRequest::List {
                type_filter: Some("binary".into()),
            },
        )
        .to_json();
        assert_eq!(list["count"], 1);
        assert_eq!(list["resources"][0]["id"], "b");

        let stats = dispatch(&store, &cfg, ApiRequest::Stats).to_json();
        assert_eq!(stats["stats"]["resource_count"], 2);
        assert_eq!(stats["stats"]["total_size"], 6);
        assert!(stats["timestamp"].is_string());

        let deleted = dispatch(&store, &cfg, ApiRequest::Delete { id: "a".into() });
        assert!(deleted.is_success());
        assert_eq!(deleted.to_json()["message"], "Resource a deleted");
        let again = dispatch(&store, &cfg, ApiRequest::Delete { id: "a".into() });
        assert_eq!(again.code, 404);
    }

    #[test]
    fn corruption_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let cfg = ProtocolConfig::default();
        let mut req = StoreRequest::new("a", encode_payload(b"raw"));
        req.compress = false;
        dispatch(&store, &cfg, ApiRequest::Store(req));
        std::fs::write(dir.path().join("a.bin"), b"bad").unwrap();

        let resp = dispatch(&store, &cfg, ApiRequest::Get { id: "a".into() });
        assert_eq!(resp.code, 500);
        assert!(resp.to_json()["message"]
            .as_str()
            .unwrap()
            .contains("integrity"));
    }
}
