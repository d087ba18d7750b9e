//! # HTTP→event bridge boundary.
//!
//! [`EventBridge`] is the engine side of the inbound HTTP binder: an external
//! web layer accepts a POST to an application-chosen path, decodes the JSON
//! body, and hands both here. The bridge derives the event key from the path,
//! fires it globally with the body as the single positional argument, and
//! always reports [`BridgeStatus::Accepted`] — the HTTP layer responds
//! `200 OK` synchronously regardless of downstream handler outcome.
//!
//! The HTTP server itself (routing, framing, content negotiation) stays
//! external; this type is framework-agnostic glue.

use std::sync::Arc;

use serde_json::Value;

use crate::engine::Manager;
use crate::rules::Args;

/// Outcome reported to the HTTP layer. Always `Accepted` by contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeStatus {
    /// The request was consumed; respond `200 OK`.
    Accepted,
}

impl BridgeStatus {
    /// The HTTP status code to respond with.
    pub fn http_code(&self) -> u16 {
        200
    }
}

/// Engine-side adapter for inbound HTTP POSTs.
pub struct EventBridge {
    manager: Arc<Manager>,
}

impl EventBridge {
    /// Creates a bridge firing into `manager`'s global context.
    pub fn new(manager: Arc<Manager>) -> Self {
        Self { manager }
    }

    /// Consumes one decoded POST.
    ///
    /// The event key is the path with surrounding slashes trimmed
    /// (`"/button1"` fires `"button1"`). Unknown keys and validation
    /// failures are logged and swallowed; the caller always gets
    /// [`BridgeStatus::Accepted`].
    pub fn handle_post(&self, path: &str, body: Value) -> BridgeStatus {
        let key = path.trim_matches('/');
        if key.is_empty() {
            tracing::warn!(path, "bridge post with empty key, dropped");
            return BridgeStatus::Accepted;
        }
        if let Err(err) = self.manager.fire_global(key, Args::one(body), None) {
            tracing::warn!(key, label = err.as_label(), %err, "bridge fire rejected");
        }
        BridgeStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ArgShape, HandlerFn, HandlerRef, Param};
    use serde_json::json;

    #[tokio::test]
    async fn post_fires_the_path_key_globally() {
        let mgr = Manager::with_defaults();
        let h: HandlerRef = HandlerFn::arc(
            "on_button",
            ArgShape::data([Param::required("body")]),
            |ctx, args| async move {
                ctx.set("body", args.first().cloned().unwrap());
                Ok(())
            },
        );
        mgr.event("button1", &h).unwrap();

        let bridge = EventBridge::new(Arc::clone(&mgr));
        let status = bridge.handle_post("/button1", json!({"button": "button1"}));
        assert_eq!(status, BridgeStatus::Accepted);
        assert_eq!(status.http_code(), 200);

        mgr.drain_due().await.unwrap();
        assert_eq!(
            mgr.global_context().get("body"),
            Some(json!({"button": "button1"}))
        );
    }

    #[tokio::test]
    async fn unknown_keys_and_bad_posts_still_accept() {
        let mgr = Manager::with_defaults();
        let bridge = EventBridge::new(Arc::clone(&mgr));

        assert_eq!(bridge.handle_post("/nobody-listens", json!(1)), BridgeStatus::Accepted);
        assert_eq!(bridge.handle_post("/", json!(1)), BridgeStatus::Accepted);
        assert_eq!(mgr.pending(), 0);
    }
}
