//! # Example: delayed
//!
//! Delayed firing and due-time ordering.
//!
//! Demonstrates how to:
//! - Fire events with a delay.
//! - Observe that dispatch follows due times, not insertion order.
//! - Drain the queue deterministically with [`Manager::run_until_idle`].
//!
//! ## Flow
//! ```text
//! fire("reminder", "slow",  delay = 900 ms)   queued first
//! fire("reminder", "fast",  delay = 300 ms)   queued second
//! fire("reminder", "now",   no delay)         queued third
//!
//! dispatch order: now ─► fast ─► slow
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example delayed
//! ```

use std::time::{Duration, Instant};

use rulefire::{ArgShape, Args, HandlerFn, HandlerRef, Manager, Param};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mgr = Manager::with_defaults();
    let started = Instant::now();

    let reminder: HandlerRef = HandlerFn::arc(
        "reminder",
        ArgShape::data([Param::required("label")]),
        move |_ctx, args| async move {
            let label = args.first().and_then(|v| v.as_str()).unwrap_or("?").to_string();
            println!("[{:>4} ms] reminder: {label}", started.elapsed().as_millis());
            Ok(())
        },
    );
    mgr.event("reminder", &reminder)?;

    // Insertion order is slow, fast, now. Dispatch order is by due time.
    mgr.fire_global(
        "reminder",
        Args::one(json!("slow")),
        Some(Duration::from_millis(900)),
    )?;
    mgr.fire_global(
        "reminder",
        Args::one(json!("fast")),
        Some(Duration::from_millis(300)),
    )?;
    mgr.fire_global("reminder", Args::one(json!("now")), None)?;

    println!("queued {} events", mgr.pending());
    mgr.run_until_idle().await?;
    println!("queue drained");
    Ok(())
}
