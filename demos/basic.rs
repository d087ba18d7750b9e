//! # Example: basic
//!
//! Minimal end-to-end run: register two rules, start the dispatch loop,
//! fire an event, and watch the engine emit an outbound payload.
//!
//! Demonstrates how to:
//! - Define handlers with [`HandlerFn`] and typed argument shapes.
//! - Guard a rule with a [`ConditionFn`].
//! - Run the dispatch loop with a cancellation token.
//! - Attach the built-in [`LogWriter`] to the outbound bus.
//!
//! ## Flow
//! ```text
//! Manager::run(token)
//!     ├─► warm-up, fire "init"
//!     ├─► on_init handler seeds context storage
//!     ├─► fire_global("user_login", {user_id: 7})
//!     │     └─► condition holds ─► on_login runs ─► emit("welcome", ...)
//!     └─► token.cancel() ─► loop exits
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic --features logging
//! ```

use std::time::Duration;

use rulefire::{
    ArgShape, Args, ConditionFn, HandlerFn, HandlerRef, LogWriter, Manager, Param,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Build the manager (global ruleset + global context + queue).
    let mgr = Manager::with_defaults();

    // 2. Print every outbound message to stdout.
    LogWriter::new().attach(mgr.outbound());

    // 3. "init" fires automatically once the loop warms up.
    let on_init: HandlerRef = HandlerFn::arc("on_init", ArgShape::ContextOnly, |ctx, _args| {
        async move {
            println!("[init] engine is up, context={}", ctx.name());
            ctx.set("logins", json!(0));
            Ok(())
        }
    });
    mgr.event("init", &on_init)?;

    // 4. A data-carrying rule, guarded by a condition on its payload.
    let on_login: HandlerRef = HandlerFn::arc(
        "on_login",
        ArgShape::data([Param::required("event_data")]),
        |ctx, args| async move {
            let data = args.first().cloned().unwrap_or(json!(null));
            let count = ctx.get_or("logins", json!(0)).as_i64().unwrap_or(0) + 1;
            ctx.set("logins", json!(count));
            println!("[login] #{count}: {data}");
            Ok(())
        },
    );
    mgr.event("user_login", &on_login)?;
    mgr.condition(
        &on_login,
        ConditionFn::arc(
            "has_user_id",
            ArgShape::data([Param::required("event_data")]),
            |_ctx, args| args.first().and_then(|v| v.get("user_id")).is_some(),
        ),
    )?;

    // 5. Start the dispatch loop.
    let token = CancellationToken::new();
    let engine = tokio::spawn(mgr.clone().run(token.clone()));

    // 6. Fire some events. The second one fails the condition and is skipped.
    tokio::time::sleep(Duration::from_millis(200)).await;
    mgr.fire_global("user_login", Args::one(json!({"user_id": 7})), None)?;
    mgr.fire_global("user_login", Args::one(json!({"anonymous": true})), None)?;

    // 7. Push something to the outside world.
    mgr.emit("welcome", json!({"greeting": "hello"}), Some(json!(7)), None);

    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();
    engine.await??;
    Ok(())
}
