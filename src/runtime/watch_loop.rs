//! # Watch Loop
//!
//! Runs the CVOConfig and CRD watchers, waits for their caches to sync, then
//! runs the workers until SIGINT/SIGTERM.
//!
//! Every watch notification goes through the [`EventBridge`], which only enqueues
//! the fixed work key. Watchers keep running while workers drain the queue on
//! shutdown and are aborted afterwards.

use crate::controller::EventBridge;
use crate::crd::CVOConfig;
use crate::runtime::error_policy::handle_watch_stream_error;
use crate::runtime::initialization::InitializationResult;
use anyhow::{anyhow, Result};
use futures::{pin_mut, Stream, StreamExt};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::Api;
use kube::{CustomResourceExt, Resource};
use kube_runtime::reflector::{self, ObjectRef};
use kube_runtime::{watcher, WatchStreamExt};
use std::collections::HashSet;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Run watchers and workers until a shutdown signal is received
pub async fn run_watch_loop(init: InitializationResult) -> Result<()> {
    let InitializationResult {
        client,
        config,
        controller,
        bridge,
        config_cache,
        config_writer,
        server_state,
        cache_sync_timeout,
    } = init;

    let configs: Api<CVOConfig> = Api::namespaced(client.clone(), &config.namespace);
    let config_stream = reflector::reflector(
        config_writer,
        watcher(configs, watcher::Config::default()),
    )
    .default_backoff();
    let config_watch = spawn_watch("CVOConfig", config_stream, bridge.clone());

    let crds: Api<CustomResourceDefinition> = Api::all(client);
    let (crd_cache, crd_writer) = reflector::store::<CustomResourceDefinition>();
    let crd_stream =
        reflector::reflector(crd_writer, watcher(crds, watcher::Config::default()))
            .default_backoff();
    let crd_watch = spawn_watch("CustomResourceDefinition", crd_stream, bridge);

    info!("Waiting for watch caches to sync...");
    crd_cache
        .wait_until_ready()
        .await
        .map_err(|e| anyhow!("CustomResourceDefinition cache failed to sync: {e:?}"))?;

    // The CVOConfig watch cannot list until its CRD exists; the first sync installs it
    if crd_cache
        .get(&ObjectRef::new(CVOConfig::crd_name()))
        .is_some()
    {
        match tokio::time::timeout(cache_sync_timeout, config_cache.wait_until_ready()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(anyhow!("CVOConfig cache failed to sync: {e:?}")),
            Err(_elapsed) => warn!(
                "CVOConfig cache did not sync within {}s, starting workers anyway",
                cache_sync_timeout.as_secs()
            ),
        }
    } else {
        info!("CVOConfig CRD not installed yet, skipping its cache sync");
    }

    info!("Watch caches synced");
    server_state.mark_ready();

    controller.run(config.workers, shutdown_signal()).await;

    config_watch.abort();
    crd_watch.abort();
    info!("Watch loop stopped");

    Ok(())
}

fn spawn_watch<K, S>(resource: &'static str, stream: S, bridge: EventBridge) -> JoinHandle<()>
where
    K: Resource<DynamicType = ()> + Send + 'static,
    S: Stream<Item = Result<watcher::Event<K>, watcher::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        info!("Starting watch for {}", resource);
        pin_mut!(stream);
        let mut seen = HashSet::new();

        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => dispatch_event(&bridge, &mut seen, event),
                Err(e) => {
                    handle_watch_stream_error(resource, &e);
                }
            }
        }

        warn!("{} watch stream ended", resource);
    })
}

/// Identity used to tell a create from an update
fn object_key<K: Resource>(object: &K) -> String {
    let meta = object.meta();
    meta.uid
        .clone()
        .or_else(|| meta.name.clone())
        .unwrap_or_default()
}

/// Map one watcher event onto the bridge
///
/// The watcher reports creates and updates alike as `Apply`; objects not seen
/// before are reported as adds.
pub fn dispatch_event<K>(bridge: &EventBridge, seen: &mut HashSet<String>, event: watcher::Event<K>)
where
    K: Resource<DynamicType = ()>,
{
    match event {
        watcher::Event::Init => seen.clear(),
        watcher::Event::InitApply(object) => {
            seen.insert(object_key(&object));
            bridge.on_add(&object);
        }
        watcher::Event::Apply(object) => {
            if seen.insert(object_key(&object)) {
                bridge.on_add(&object);
            } else {
                bridge.on_update(None, &object);
            }
        }
        watcher::Event::Delete(object) => {
            seen.remove(&object_key(&object));
            bridge.on_delete(&object);
        }
        watcher::Event::InitDone => {}
    }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{WorkKey, WorkSink};
    use crate::crd::CVOConfigSpec;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        keys: Mutex<Vec<WorkKey>>,
    }

    impl WorkSink for RecordingSink {
        fn enqueue(&self, key: WorkKey) {
            self.keys.lock().unwrap().push(key);
        }
    }

    fn config_with_uid(uid: &str) -> CVOConfig {
        let mut config = CVOConfig::new(
            "version",
            CVOConfigSpec {
                upstream: "http://localhost:8080/graph".to_string(),
                channel: "fast".to_string(),
                cluster_id: "7f2c5a3e-0d4b-4c8e-9a61-2b3f4d5e6a7b".to_string(),
            },
        );
        config.metadata.uid = Some(uid.to_string());
        config
    }

    #[test]
    fn test_every_event_enqueues_the_fixed_key() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = EventBridge::new(
            Arc::clone(&sink) as Arc<dyn WorkSink>,
            "kube-system/installconfig",
        );
        let mut seen = HashSet::new();

        dispatch_event::<CVOConfig>(&bridge, &mut seen, watcher::Event::Init);
        dispatch_event(&bridge, &mut seen, watcher::Event::InitApply(config_with_uid("a")));
        dispatch_event::<CVOConfig>(&bridge, &mut seen, watcher::Event::InitDone);
        dispatch_event(&bridge, &mut seen, watcher::Event::Apply(config_with_uid("a")));
        dispatch_event(&bridge, &mut seen, watcher::Event::Delete(config_with_uid("a")));

        let keys = sink.keys.lock().unwrap().clone();
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| k == "kube-system/installconfig"));
    }

    #[test]
    fn test_apply_tracks_seen_objects() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = EventBridge::new(Arc::clone(&sink) as Arc<dyn WorkSink>, "key");
        let mut seen = HashSet::new();

        dispatch_event(&bridge, &mut seen, watcher::Event::Apply(config_with_uid("a")));
        assert!(seen.contains("a"));

        dispatch_event(&bridge, &mut seen, watcher::Event::Apply(config_with_uid("a")));
        assert_eq!(seen.len(), 1);

        dispatch_event(&bridge, &mut seen, watcher::Event::Delete(config_with_uid("a")));
        assert!(seen.is_empty());
        assert_eq!(sink.keys.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_init_resets_seen_objects() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = EventBridge::new(Arc::clone(&sink) as Arc<dyn WorkSink>, "key");
        let mut seen = HashSet::new();

        dispatch_event(&bridge, &mut seen, watcher::Event::Apply(config_with_uid("a")));
        dispatch_event::<CVOConfig>(&bridge, &mut seen, watcher::Event::Init);
        assert!(seen.is_empty());
    }
}
