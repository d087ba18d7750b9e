//! # Manager: process-wide scheduler state and the dispatch loop.
//!
//! The [`Manager`] owns the global [`Ruleset`], the global [`Context`], the
//! append-only list of live contexts, the shared [`EventQueue`], and the
//! outbound bus. It is an explicit handle constructed once at startup and
//! passed by `Arc` — callers needing isolation construct their own
//! ruleset/context pair via [`Manager::create_context`].
//!
//! ## Dispatch loop
//! ```text
//! run(token):
//!   ├─► sleep(cfg.warmup)                       (cancellable)
//!   ├─► fire "init" on the global context       (validation errors logged)
//!   └─► loop {
//!         ├─ pop due event ─► context.fire_immediate(key, args)
//!         │     ├─ Fail / panic ─► error log, continue
//!         │     └─ Fatal        ─► return EngineError::HandlerFatal
//!         └─ nothing due ─► sleep until earliest due time
//!                           or until a new event is pushed
//!                           or until the token is cancelled
//!       }
//! ```
//!
//! Events become eligible in non-decreasing due-time order; equal due times
//! dispatch in insertion order. Handlers run only on the dispatch task, never
//! concurrently with each other, and never under the queue lock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::engine::{Context, ContextRef, EngineConfig, EventQueue, PendingEvent};
use crate::error::{EngineError, FireError, RegisterError};
use crate::outbound::{OutboundBus, OutboundMessage};
use crate::rules::{Args, ConditionRef, HandlerRef, Ruleset};

/// Process-wide scheduler: global ruleset/context, live contexts, pending
/// queue, and the outbound publish boundary.
pub struct Manager {
    cfg: EngineConfig,
    ruleset: Arc<Ruleset>,
    global: ContextRef,
    contexts: Mutex<Vec<ContextRef>>,
    queue: Arc<EventQueue>,
    outbound: OutboundBus,
}

impl Manager {
    /// Creates a manager with the given configuration.
    ///
    /// The global ruleset and the global context (named `"global"`) are
    /// created here, before any rule registration.
    pub fn new(cfg: EngineConfig) -> Arc<Self> {
        let queue = Arc::new(EventQueue::new());
        let ruleset = Ruleset::new();
        let global = Context::new(
            Some("global".to_string()),
            Arc::clone(&ruleset),
            Arc::clone(&queue),
        );
        let outbound = OutboundBus::new(cfg.outbound_capacity_clamped());
        Arc::new(Self {
            cfg,
            ruleset,
            global,
            contexts: Mutex::new(vec![]),
            queue,
            outbound,
        })
    }

    /// Creates a manager with default configuration.
    pub fn with_defaults() -> Arc<Self> {
        Self::new(EngineConfig::default())
    }

    /// The global ruleset.
    pub fn ruleset(&self) -> &Arc<Ruleset> {
        &self.ruleset
    }

    /// The global context.
    pub fn global_context(&self) -> &ContextRef {
        &self.global
    }

    /// Snapshot of every live context, including the global one.
    pub fn contexts(&self) -> Vec<ContextRef> {
        let mut all = vec![Arc::clone(&self.global)];
        all.extend(
            self.contexts
                .lock()
                .expect("contexts lock poisoned")
                .iter()
                .cloned(),
        );
        all
    }

    /// Number of pending events.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    // ---------------------------
    // Registration conveniences (global ruleset)
    // ---------------------------

    /// Registers `handler` under `key` in the global ruleset.
    pub fn event(&self, key: &str, handler: &HandlerRef) -> Result<(), RegisterError> {
        self.ruleset.register(key, handler)
    }

    /// Attaches `condition` to `handler`'s rule in the global ruleset.
    pub fn condition(
        &self,
        handler: &HandlerRef,
        condition: ConditionRef,
    ) -> Result<(), RegisterError> {
        self.ruleset.condition(handler, condition)
    }

    // ---------------------------
    // Contexts and firing
    // ---------------------------

    /// Creates a new context and registers it in the live-context list.
    ///
    /// Defaults: an engine-assigned unique name, the global ruleset.
    pub fn create_context(
        &self,
        name: Option<String>,
        ruleset: Option<Arc<Ruleset>>,
    ) -> ContextRef {
        let ctx = Context::new(
            name,
            ruleset.unwrap_or_else(|| Arc::clone(&self.ruleset)),
            Arc::clone(&self.queue),
        );
        self.contexts
            .lock()
            .expect("contexts lock poisoned")
            .push(Arc::clone(&ctx));
        ctx
    }

    /// Fires `key` on the global context.
    pub fn fire_global(
        &self,
        key: &str,
        args: Args,
        delay: Option<Duration>,
    ) -> Result<(), FireError> {
        self.global.fire(key, args, delay)
    }

    /// Fires `key` on every live context, validated per context's ruleset.
    ///
    /// Contexts are fired in registration order; the first validation
    /// failure aborts the remainder (already-enqueued events stay queued).
    pub fn fire_all(
        &self,
        key: &str,
        args: Args,
        delay: Option<Duration>,
    ) -> Result<(), FireError> {
        for ctx in self.contexts() {
            ctx.fire(key, args.clone(), delay)?;
        }
        Ok(())
    }

    // ---------------------------
    // Dispatch loop
    // ---------------------------

    /// Runs the dispatch loop until `token` is cancelled or a handler raises
    /// a fatal error.
    ///
    /// Starts with a warm-up sleep, then fires the well-known init key with
    /// no arguments on the global context.
    pub async fn run(self: Arc<Self>, token: CancellationToken) -> Result<(), EngineError> {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = tokio::time::sleep(self.cfg.warmup) => {}
        }

        tracing::debug!(key = %self.cfg.init_key, "firing init event");
        if let Err(err) = self.global.fire(&self.cfg.init_key, Args::none(), None) {
            tracing::warn!(label = err.as_label(), %err, "init fire rejected");
        }

        loop {
            if token.is_cancelled() {
                return Ok(());
            }
            if let Some(event) = self.queue.pop_due() {
                self.dispatch(event).await?;
                continue;
            }
            match self.queue.next_due() {
                Some(due) => {
                    tokio::select! {
                        _ = token.cancelled() => return Ok(()),
                        _ = tokio::time::sleep_until(due) => {}
                        _ = self.queue.changed() => {}
                    }
                }
                None => {
                    tokio::select! {
                        _ = token.cancelled() => return Ok(()),
                        _ = self.queue.changed() => {}
                    }
                }
            }
        }
    }

    /// Dispatches everything due right now and returns the count.
    ///
    /// Events enqueued by the dispatched handlers are included when they are
    /// immediately due. Useful for deterministic tests ("drain the loop
    /// once").
    pub async fn drain_due(self: &Arc<Self>) -> Result<usize, EngineError> {
        let mut count = 0;
        while let Some(event) = self.queue.pop_due() {
            self.dispatch(event).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Dispatches until the pending queue is empty, sleeping across
    /// not-yet-due delays ("stop when empty" mode, for deterministic tests
    /// and batch-style runs).
    pub async fn run_until_idle(self: &Arc<Self>) -> Result<(), EngineError> {
        loop {
            if let Some(event) = self.queue.pop_due() {
                self.dispatch(event).await?;
                continue;
            }
            match self.queue.next_due() {
                Some(due) => tokio::time::sleep_until(due).await,
                None => return Ok(()),
            }
        }
    }

    async fn dispatch(&self, event: PendingEvent) -> Result<(), EngineError> {
        tracing::debug!(
            key = event.key(),
            context = event.context().name(),
            "dispatching event"
        );
        event.context().fire_immediate(event.key(), event.args()).await
    }

    // ---------------------------
    // Outbound publish boundary
    // ---------------------------

    /// Emits a JSON payload to the outside world through the outbound bus.
    ///
    /// When `id` is set it is merged into `data` under key `"id"` (requires
    /// an object payload; otherwise the payload is published unmerged with a
    /// warning). When `target` is set, delivery is scoped to that session,
    /// else broadcast.
    pub fn emit(&self, event: &str, mut data: Value, id: Option<Value>, target: Option<&str>) {
        if let Some(id) = id {
            match &mut data {
                Value::Object(map) => {
                    map.insert("id".to_string(), id);
                }
                _ => {
                    tracing::warn!(event, "emit id requires an object payload, left unmerged");
                }
            }
        }
        self.outbound.publish(OutboundMessage::new(event, data, target));
    }

    /// The outbound bus; transports subscribe here.
    pub fn outbound(&self) -> &OutboundBus {
        &self.outbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ArgShape, ConditionFn, HandlerFn, Param};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn data_handler(name: &'static str, params: &[&'static str]) -> HandlerRef {
        HandlerFn::arc(
            name,
            ArgShape::data(params.iter().map(|p| Param::required(*p))),
            |_ctx, _args| async { Ok(()) },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fire_then_drain_calls_handler_once_with_data() {
        let mgr = Manager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        let h: HandlerRef = {
            let calls = Arc::clone(&calls);
            HandlerFn::arc(
                "h",
                ArgShape::data([Param::required("data")]),
                move |ctx, args| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        ctx.set("got", args.first().cloned().unwrap_or(Value::Null));
                        Ok(())
                    }
                },
            )
        };
        mgr.event("test", &h).unwrap();

        mgr.fire_global("test", Args::one(json!("x")), None).unwrap();
        let dispatched = mgr.drain_due().await.unwrap();

        assert_eq!(dispatched, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.global_context().get("got"), Some(json!("x")));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_events_dispatch_in_due_time_order() {
        let mgr = Manager::with_defaults();
        let order = Arc::new(Mutex::new(Vec::<String>::new()));
        let h: HandlerRef = {
            let order = Arc::clone(&order);
            HandlerFn::arc(
                "recorder",
                ArgShape::data([Param::required("tag")]),
                move |_ctx, args| {
                    let order = Arc::clone(&order);
                    async move {
                        let tag = args.first().and_then(Value::as_str).unwrap_or("?").to_string();
                        order.lock().unwrap().push(tag);
                        Ok(())
                    }
                },
            )
        };
        mgr.event("tagged", &h).unwrap();

        // A fired first but due later; B must dispatch strictly before A.
        mgr.fire_global("tagged", Args::one(json!("A")), Some(Duration::from_secs(1)))
            .unwrap();
        mgr.fire_global(
            "tagged",
            Args::one(json!("B")),
            Some(Duration::from_millis(100)),
        )
        .unwrap();

        mgr.run_until_idle().await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["B".to_string(), "A".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_respects_due_times() {
        let mgr = Manager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        let h: HandlerRef = {
            let calls = Arc::clone(&calls);
            HandlerFn::arc("tick", ArgShape::ContextOnly, move |_ctx, _args| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        mgr.event("tick", &h).unwrap();

        mgr.fire_global("tick", Args::none(), Some(Duration::from_secs(1)))
            .unwrap();

        assert_eq!(mgr.drain_due().await.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "not yet due");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(mgr.drain_due().await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn false_condition_suppresses_handler() {
        let mgr = Manager::with_defaults();
        let calls = Arc::new(AtomicUsize::new(0));
        let h: HandlerRef = {
            let calls = Arc::clone(&calls);
            HandlerFn::arc(
                "guarded",
                ArgShape::data([Param::required("data")]),
                move |_ctx, _args| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            )
        };
        mgr.event("test", &h).unwrap();
        mgr.condition(
            &h,
            ConditionFn::arc(
                "only_xs",
                ArgShape::data([Param::required("data")]),
                |_ctx, args| args.first() == Some(&json!("x")),
            ),
        )
        .unwrap();

        for _ in 0..3 {
            mgr.fire_global("test", Args::one(json!("y")), None).unwrap();
        }
        mgr.fire_global("test", Args::one(json!("x")), None).unwrap();
        mgr.run_until_idle().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1, "only the matching firing ran");
    }

    #[tokio::test(start_paused = true)]
    async fn fire_all_reaches_every_context() {
        let mgr = Manager::with_defaults();
        let hits = Arc::new(Mutex::new(Vec::<String>::new()));
        let h: HandlerRef = {
            let hits = Arc::clone(&hits);
            HandlerFn::arc("who", ArgShape::ContextOnly, move |ctx, _args| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.lock().unwrap().push(ctx.name().to_string());
                    Ok(())
                }
            })
        };
        mgr.event("ping", &h).unwrap();
        mgr.create_context(Some("aux".to_string()), None);

        mgr.fire_all("ping", Args::none(), None).unwrap();
        mgr.run_until_idle().await.unwrap();

        let got = hits.lock().unwrap().clone();
        assert_eq!(got, vec!["global".to_string(), "aux".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn fire_all_aborts_on_the_first_rejecting_context() {
        let mgr = Manager::with_defaults();
        mgr.event("test", &data_handler("h", &["data"])).unwrap();

        // The aux context validates against its own ruleset, where "test"
        // takes no data.
        let aux_rules = Ruleset::new();
        let tick: HandlerRef =
            HandlerFn::arc("tick", ArgShape::ContextOnly, |_ctx, _args| async { Ok(()) });
        aux_rules.event("test").bind(&tick).unwrap();
        mgr.create_context(Some("aux".to_string()), Some(aux_rules));

        let err = mgr
            .fire_all("test", Args::one(json!("x")), None)
            .unwrap_err();
        assert_eq!(err.as_label(), "unexpected_arguments");

        // The global context fired before the failure; its event stays
        // queued and dispatches normally.
        assert_eq!(mgr.pending(), 1);
        assert_eq!(mgr.drain_due().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_fires_init_after_warmup_and_stops_on_cancel() {
        let mgr = Manager::with_defaults();
        let inited = Arc::new(AtomicUsize::new(0));
        let h: HandlerRef = {
            let inited = Arc::clone(&inited);
            HandlerFn::arc("on_init", ArgShape::ContextOnly, move |_ctx, _args| {
                let inited = Arc::clone(&inited);
                async move {
                    inited.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        mgr.event("init", &h).unwrap();

        let token = CancellationToken::new();
        let loop_handle = tokio::spawn(Arc::clone(&mgr).run(token.clone()));

        // Let the warm-up elapse and the init dispatch run.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(inited.load(Ordering::SeqCst), 1);

        token.cancel();
        loop_handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn handler_enqueued_events_are_dispatched_too() {
        let mgr = Manager::with_defaults();
        let done = Arc::new(AtomicUsize::new(0));

        let second: HandlerRef = {
            let done = Arc::clone(&done);
            HandlerFn::arc("second", ArgShape::ContextOnly, move |_ctx, _args| {
                let done = Arc::clone(&done);
                async move {
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        let first: HandlerRef = HandlerFn::arc("first", ArgShape::ContextOnly, |ctx, _args| async move {
            // Re-entering fire from inside a handler must not deadlock.
            ctx.fire("second", Args::none(), None)
                .map_err(crate::error::HandlerError::fail)?;
            Ok(())
        });
        mgr.event("first", &first).unwrap();
        mgr.event("second", &second).unwrap();

        mgr.fire_global("first", Args::none(), None).unwrap();
        mgr.run_until_idle().await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_handler_stops_the_loop() {
        let mgr = Manager::with_defaults();
        let h: HandlerRef = HandlerFn::arc("fatal", ArgShape::ContextOnly, |_ctx, _args| async {
            Err(crate::error::HandlerError::fatal("unrecoverable"))
        });
        mgr.event("boom", &h).unwrap();

        mgr.fire_global("boom", Args::none(), None).unwrap();
        let err = mgr.run_until_idle().await.unwrap_err();
        assert_eq!(err.as_label(), "engine_handler_fatal");
    }

    #[tokio::test]
    async fn emit_merges_id_and_scopes_target() {
        let mgr = Manager::with_defaults();
        let mut rx = mgr.outbound().subscribe();

        mgr.emit("update", json!({"v": 1}), Some(json!(42)), Some("session-1"));
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event, "update");
        assert_eq!(msg.data, json!({"v": 1, "id": 42}));
        assert_eq!(msg.target.as_deref(), Some("session-1"));

        // Non-object payloads are published unmerged.
        mgr.emit("raw", json!("plain"), Some(json!(7)), None);
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.data, json!("plain"));
        assert_eq!(msg.target, None);
    }
}
