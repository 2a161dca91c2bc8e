//! Watchtree quickstart: observe a small tree and watch it change.
//!
//! Demonstrates:
//!   1. Building a nested tree of maps and sequences
//!   2. Starting a session on an event loop
//!   3. Synchronous `updated` events from writes
//!   4. `new` and `delete` events at tick boundaries
//!   5. Stopping the session and reading its metrics
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example quickstart

use watchtree_core::{ChangeEvent, Container, Value};
use watchtree_engine::Session;
use watchtree_sched::{EventLoop, LoopConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ─── Tree ───────────────────────────────────────────────────

    let settings = Container::map_from([
        ("theme", Value::from("dark")),
        ("font_size", Value::from(12)),
    ]);
    let recent = Container::seq_from(["notes.txt", "todo.md"]);
    let root = Container::map_from([
        ("settings", Value::from(settings.clone())),
        ("recent", Value::from(recent.clone())),
    ]);

    // ─── Session ────────────────────────────────────────────────

    let mut event_loop = match EventLoop::new(LoopConfig::default()) {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("invalid loop config: {e}");
            return;
        }
    };
    let observer = |event: &ChangeEvent| println!("  {event}");
    let session = match Session::observe(event_loop.scheduler(), root.clone(), observer) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("cannot observe: {e}");
            return;
        }
    };
    println!("observing {} nodes", session.live_nodes());

    // ─── Writes fire immediately ────────────────────────────────

    println!("write settings.font_size:");
    settings.set("font_size", 14);

    // ─── Additions and deletions wait for a tick ────────────────

    println!("push to recent, delete settings.theme:");
    recent.push("plan.md");
    settings.remove("theme");
    event_loop.turn();

    println!("write the new entry:");
    recent.set("2", "plan-v2.md");

    // ─── Stop ───────────────────────────────────────────────────

    session.stop();
    settings.set("font_size", 16);
    event_loop.run_until_idle(10);

    let m = session.metrics();
    println!(
        "ticks={} updated={} new={} delete={} state={:?}",
        m.ticks,
        m.updated_events,
        m.new_events,
        m.delete_events,
        session.state()
    );
}
