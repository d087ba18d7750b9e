//! # Example: datastream
//!
//! Line-delimited JSON ingestion over a TCP socket.
//!
//! A tiny in-process server plays the role of an external device feed: it
//! writes one JSON frame per line, including a malformed line that the
//! reader silently drops. The client side connects with
//! [`connect_datastream`] and forwards every decoded frame into the engine
//! through [`manager_sink`].
//!
//! ## Flow
//! ```text
//! feed (TCP server)                     engine (TCP client)
//!   {"key":"button1","data":{...}}\n ──► decode ─► fire_global("button1", data)
//!   not json\n                       ──► dropped
//!   {"key":"button2","data":{...}}\n ──► decode ─► fire_global("button2", data)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example datastream
//! ```

use std::time::Duration;

use rulefire::{connect_datastream, manager_sink, ArgShape, HandlerFn, HandlerRef, Manager, Param};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mgr = Manager::with_defaults();

    // One handler answering to both button keys.
    let on_button: HandlerRef = HandlerFn::arc(
        "on_button",
        ArgShape::data([Param::required("event_data")]),
        |_ctx, args| async move {
            println!("[button] {}", args.first().cloned().unwrap_or_default());
            Ok(())
        },
    );
    mgr.event("button1", &on_button)?;
    mgr.event("button2", &on_button)?;

    // In-process stand-in for an external device feed.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let feed = tokio::spawn(async move {
        let (mut conn, _) = listener.accept().await?;
        conn.write_all(b"{\"key\": \"button1\", \"data\": {\"button\": \"button1\"}}\n")
            .await?;
        conn.write_all(b"not json\n").await?;
        conn.write_all(b"{\"key\": \"button2\", \"data\": {\"button\": \"button2\"}}\n")
            .await?;
        Ok::<_, std::io::Error>(())
    });

    // Start the dispatch loop.
    let token = CancellationToken::new();
    let engine = tokio::spawn(mgr.clone().run(token.clone()));

    // Ingest the feed until the peer closes, then let the queue drain.
    connect_datastream(addr, manager_sink(&mgr)).await?;
    feed.await??;
    tokio::time::sleep(Duration::from_millis(300)).await;

    token.cancel();
    engine.await??;
    Ok(())
}
