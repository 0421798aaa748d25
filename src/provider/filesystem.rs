//! # Directory Payload Fetcher
//!
//! Reads an extracted update payload from `<prefix>/<channel>/`.
//!
//! Every `.yaml`, `.yml` and `.json` file below the directory is parsed, in file
//! name order, as one or more Kubernetes manifests. Multi-document YAML files
//! are supported; empty documents are skipped.

use crate::controller::reconciler::{DesiredConfig, Stage, SyncError};
use crate::observability;
use crate::provider::{payload_dir, Payload, PayloadFetcher};
use async_trait::async_trait;
use kube::api::DynamicObject;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Fetches update payloads from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct DirectoryPayloadFetcher;

impl DirectoryPayloadFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PayloadFetcher for DirectoryPayloadFetcher {
    async fn fetch(
        &self,
        path_prefix: &Path,
        config: &DesiredConfig,
    ) -> Result<Payload, SyncError> {
        let dir = payload_dir(path_prefix, config);
        let start = std::time::Instant::now();

        // Directory walks and file reads are blocking
        let payload = tokio::task::spawn_blocking(move || read_payload(&dir))
            .await
            .map_err(|e| {
                SyncError::transient(Stage::Fetch, format!("payload read task failed: {e}"))
            })??;

        observability::metrics::observe_payload_fetch_duration(start.elapsed().as_secs_f64());
        info!(
            "Fetched update payload from {} ({} manifest(s))",
            payload.source.display(),
            payload.manifests.len()
        );
        Ok(payload)
    }
}

/// Read every manifest below `dir`
///
/// A missing directory is transient (the payload may not be extracted yet);
/// unparseable manifests are permanent.
pub fn read_payload(dir: &Path) -> Result<Payload, SyncError> {
    if !dir.is_dir() {
        return Err(SyncError::transient(
            Stage::Fetch,
            format!("update payload directory {} not found", dir.display()),
        ));
    }

    let mut manifests = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::transient(Stage::Fetch, e))?;
        if !entry.file_type().is_file() || !is_manifest(entry.path()) {
            continue;
        }

        debug!("Reading manifest file {}", entry.path().display());
        let content = std::fs::read_to_string(entry.path()).map_err(|e| {
            SyncError::transient(
                Stage::Fetch,
                format!("failed to read {}: {e}", entry.path().display()),
            )
        })?;
        manifests.extend(parse_manifests(entry.path(), &content)?);
    }

    Ok(Payload {
        source: dir.to_path_buf(),
        manifests,
    })
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext))
}

fn parse_manifests(path: &Path, content: &str) -> Result<Vec<DynamicObject>, SyncError> {
    let mut manifests = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| {
            SyncError::permanent(Stage::Fetch, format!("invalid YAML in {}: {e}", path.display()))
        })?;
        if value.is_null() {
            continue;
        }
        let manifest: DynamicObject = serde_yaml::from_value(value).map_err(|e| {
            SyncError::permanent(
                Stage::Fetch,
                format!("invalid manifest in {}: {e}", path.display()),
            )
        })?;
        manifests.push(manifest);
    }
    Ok(manifests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn config(channel: &str) -> DesiredConfig {
        DesiredConfig {
            namespace: "ns".to_string(),
            name: "version".to_string(),
            upstream: "http://localhost:8080/graph".to_string(),
            channel: channel.to_string(),
            cluster_id: Uuid::new_v4(),
        }
    }

    const CONFIG_MAPS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: first
  namespace: default
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: second
  namespace: default
"#;

    const NAMESPACE: &str = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: payload-ns
"#;

    #[tokio::test]
    async fn test_fetch_reads_channel_directory_in_order() {
        let prefix = tempfile::tempdir().unwrap();
        let channel_dir = prefix.path().join("fast");
        fs::create_dir_all(&channel_dir).unwrap();
        fs::write(channel_dir.join("20-namespace.yml"), NAMESPACE).unwrap();
        fs::write(channel_dir.join("10-configmaps.yaml"), CONFIG_MAPS).unwrap();
        fs::write(channel_dir.join("README.md"), "not a manifest").unwrap();

        let payload = DirectoryPayloadFetcher::new()
            .fetch(prefix.path(), &config("fast"))
            .await
            .unwrap();

        assert_eq!(payload.source, channel_dir);
        let names: Vec<_> = payload
            .manifests
            .iter()
            .map(|m| m.metadata.name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["first", "second", "payload-ns"]);
        let kind = payload.manifests[2].types.as_ref().map(|t| t.kind.as_str());
        assert_eq!(kind, Some("Namespace"));
    }

    #[tokio::test]
    async fn test_missing_channel_directory_is_transient() {
        let prefix = tempfile::tempdir().unwrap();

        let err = DirectoryPayloadFetcher::new()
            .fetch(prefix.path(), &config("candidate"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transient");
        assert_eq!(err.stage(), Stage::Fetch);
    }

    #[test]
    fn test_invalid_yaml_is_permanent() {
        let prefix = tempfile::tempdir().unwrap();
        fs::write(prefix.path().join("broken.yaml"), "kind: [unterminated").unwrap();

        let err = read_payload(prefix.path()).unwrap_err();

        assert_eq!(err.kind(), "permanent");
    }

    #[test]
    fn test_empty_documents_are_skipped() {
        let prefix = tempfile::tempdir().unwrap();
        fs::write(prefix.path().join("ns.yaml"), format!("---\n{NAMESPACE}\n---\n")).unwrap();

        let payload = read_payload(prefix.path()).unwrap();

        assert_eq!(payload.manifests.len(), 1);
    }
}
