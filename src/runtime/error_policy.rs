//! # Error Policy
//!
//! Classification and logging of watch stream errors.
//!
//! Watch streams run with `kube_runtime`'s default backoff, so errors never end a
//! stream; this module only decides how loudly each class is reported.

use tracing::{error, warn};

/// Watch error classes, derived from the error's rendered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401 - RBAC revoked or token expired
    Unauthorized,
    /// 410 - resource version too old, the watcher relists
    Expired,
    /// 429 - API server throttling or storage reinitializing
    Throttled,
    /// Watched resource type not served (CRD not installed yet)
    NotFound,
    Other,
}

pub fn classify_watch_error(error_string: &str) -> WatchErrorClass {
    let is_401 = error_string.contains("401") || error_string.contains("Unauthorized");
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");
    let is_429 = error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests");
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("NotFound")
        || (error_string.contains("404") && error_string.contains("not found"));

    if is_401 {
        WatchErrorClass::Unauthorized
    } else if is_410 {
        WatchErrorClass::Expired
    } else if is_429 {
        WatchErrorClass::Throttled
    } else if is_not_found {
        WatchErrorClass::NotFound
    } else {
        WatchErrorClass::Other
    }
}

/// Log a watch stream error for `resource`
pub fn handle_watch_stream_error(
    resource: &str,
    error: &kube_runtime::watcher::Error,
) -> WatchErrorClass {
    let error_string = error.to_string();
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        resource = resource,
        error = %error_string
    );
    let _error_guard = error_span.enter();

    let class = classify_watch_error(&error_string);
    match class {
        WatchErrorClass::Unauthorized => {
            error!(
                "Watch on {} failed with 401 Unauthorized - RBAC revoked or token expired",
                resource
            );
            error!("   Verify the controller's ServiceAccount can list and watch {}", resource);
        }
        WatchErrorClass::Expired => {
            warn!(
                "Watch on {} expired (410) - this is normal after restarts, relisting",
                resource
            );
        }
        WatchErrorClass::Throttled => {
            warn!("API server throttled watch on {} (429), backing off", resource);
        }
        WatchErrorClass::NotFound => {
            warn!(
                "{} is not served yet (CRD not established?), watch will retry",
                resource
            );
        }
        WatchErrorClass::Other => {
            error!("Watch stream error on {}: {}", resource, error_string);
        }
    }
    class
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unauthorized() {
        assert_eq!(
            classify_watch_error("ApiError: Unauthorized (401)"),
            WatchErrorClass::Unauthorized
        );
    }

    #[test]
    fn test_classify_expired() {
        assert_eq!(
            classify_watch_error("too old resource version: 123 (456)"),
            WatchErrorClass::Expired
        );
        assert_eq!(classify_watch_error("ApiError: Gone (410)"), WatchErrorClass::Expired);
    }

    #[test]
    fn test_classify_throttled() {
        assert_eq!(
            classify_watch_error("storage is (re)initializing"),
            WatchErrorClass::Throttled
        );
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify_watch_error(
                "ApiError: the server could not find the requested resource: NotFound (404)"
            ),
            WatchErrorClass::NotFound
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(
            classify_watch_error("connection reset by peer"),
            WatchErrorClass::Other
        );
    }
}
