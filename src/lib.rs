//! Harrier — a scenario harness that drives declarative state-machine workers
//! against an HTTP service.
//!
//! Each worker interprets a [`StateGraph`]: a set of named states, each with
//! an ordered task list (HTTP requests) and an ordered transition list. After
//! every task, transitions are evaluated against the response outcome and the
//! first match decides the next state; a terminal transition ends the
//! worker's run. Every task execution yields a [`MetricRecord`] with the
//! outcome and latency of that request.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`StateGraph`]: the declarative scenario. Pure data, loadable from JSON,
//!   validated at startup, shared read-only by every worker.
//! - [`HttpCapability`]: the sole I/O boundary. Production runs use
//!   [`ReqwestCapability`]; tests swap in scripted in-memory implementations.
//! - [`Worker`]: one state-machine executor with a private credential queue
//!   and a private record buffer.
//! - [`Orchestrator`]: keeps a bounded pool of workers alive, one per
//!   credential, replacing each finished worker with a fresh one and
//!   funnelling its records into the collector.
//! - [`MetricsCollector`]: process-wide record sink plus the shared
//!   "keep running" flag that shutdown wiring clears.
//! - [`Reporter`]: emits the accumulated records once, at the end of a run.
//!
//! Everything suspends only at the HTTP call; the rest of a worker's loop
//! runs to completion without yielding. The collector is written by a single
//! task (the orchestrator), so only the run flag is shared across tasks.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use harrier::{
//!     Condition, Credential, HttpVerb, MetricsCollector, Orchestrator, ReqwestCapability,
//!     Reporter, StateDef, StateGraph, StdoutReporter, Task, Transition,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let graph = StateGraph {
//!         initial_state: "LOGIN".into(),
//!         credential_state: "LOGIN".into(),
//!         states: HashMap::from([
//!             (
//!                 "LOGIN".into(),
//!                 StateDef {
//!                     tasks: vec![Task {
//!                         name: "login".into(),
//!                         verb: HttpVerb::Post,
//!                         url: "https://example.com/login".into(),
//!                         body: Some(serde_json::Map::new()),
//!                     }],
//!                     transitions: vec![
//!                         Transition {
//!                             condition: Condition::StatusIs(200),
//!                             target: "COMPLETE".into(),
//!                             terminal: false,
//!                         },
//!                         Transition {
//!                             condition: Condition::StatusNot(200),
//!                             target: "LOGIN_FAILED".into(),
//!                             terminal: true,
//!                         },
//!                     ],
//!                 },
//!             ),
//!             ("COMPLETE".into(), StateDef::default()),
//!             ("LOGIN_FAILED".into(), StateDef::default()),
//!         ]),
//!     };
//!
//!     let credentials = vec![Credential::from_iter([
//!         ("username".to_string(), "user1".to_string()),
//!         ("password".to_string(), "pass1".to_string()),
//!     ])];
//!
//!     let mut collector = MetricsCollector::new();
//!     let flag = collector.run_flag();
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         flag.clear();
//!     });
//!
//!     Orchestrator::builder()
//!         .graph(Arc::new(graph))
//!         .capability(Arc::new(ReqwestCapability::new()))
//!         .credentials(credentials)
//!         .build()
//!         .run(&mut collector)
//!         .await?;
//!
//!     StdoutReporter.report(collector.records()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Design notes
//!
//! - A state whose whole task list matches no transition re-runs its task
//!   list until shutdown. That is the graph's polling policy, deliberately
//!   preserved; see [`Worker::run`].
//! - The worker pool is bounded (one live worker per credential) rather than
//!   growing without limit; see [`Orchestrator`].
//! - Shutdown drains in-flight workers so the final report loses no records.
//!
//! # Where to start
//!
//! - Read the docs for [`StateGraph`], [`Worker`], and [`Orchestrator`].
//! - See `demos/login_flow.rs` for a runnable scenario.

/// The HTTP capability boundary
pub mod capability;
/// Record sink and the shared run flag
pub mod collector;
/// The declarative state graph
pub mod graph;
/// Single metric samples
pub mod metric;
/// Worker-pool supervision
pub mod orchestrator;
/// Reports and Reporters
pub mod report;
/// The state-machine executor
pub mod worker;

pub use capability::{HttpCapability, ReqwestCapability, TransportError};
pub use collector::{MetricsCollector, RunFlag};
pub use graph::{
    Condition, Credential, GraphError, HttpVerb, StateDef, StateGraph, Task, Transition,
};
pub use metric::MetricRecord;
pub use orchestrator::Orchestrator;
pub use report::{JsonReporter, Reporter, StdoutReporter};
pub use worker::Worker;
