use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::capability::HttpCapability;
use crate::collector::RunFlag;
use crate::graph::{Credential, StateGraph, Task};
use crate::metric::MetricRecord;

/// One running instance of the state-machine executor.
///
/// A worker owns its current state, its private credential queue, and its
/// accumulated records; nothing here is shared with other workers. It walks
/// the graph from the initial state until it takes a terminal transition,
/// reaches a state with no tasks, steps onto a state the graph does not
/// define, or observes the shared flag cleared.
pub struct Worker {
    graph: Arc<StateGraph>,
    capability: Arc<dyn HttpCapability>,
    running: RunFlag,
    state: String,
    credentials: VecDeque<Credential>,
    current_credential: Option<Credential>,
    records: Vec<MetricRecord>,
}

impl Worker {
    pub fn new(
        graph: Arc<StateGraph>,
        capability: Arc<dyn HttpCapability>,
        credentials: VecDeque<Credential>,
        running: RunFlag,
    ) -> Self {
        let state = graph.initial_state.clone();
        Self {
            graph,
            capability,
            running,
            state,
            credentials,
            current_credential: None,
            records: Vec::new(),
        }
    }

    /// The state the worker is in, or was halted in.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MetricRecord> {
        self.records
    }

    /// Drive the state machine to completion.
    ///
    /// Tasks run in declared order; after each task the state's transitions
    /// are evaluated in declared order against the outcome and the first
    /// match wins. When a full pass over the task list matches no transition
    /// at all, the same task list runs again. That is the graph's polling
    /// policy, kept on purpose: such a state loops until shutdown.
    pub async fn run(&mut self) {
        let graph = Arc::clone(&self.graph);
        'states: while self.running.is_set() {
            let Some(def) = graph.state(&self.state) else {
                tracing::debug!(state = %self.state, "state not in graph, run over");
                break;
            };
            if def.tasks.is_empty() {
                // Terminal sink. (Also covers a malformed state that declares
                // transitions but no tasks: transitions are only evaluated
                // after a task, so it could never make progress.)
                tracing::debug!(state = %self.state, "reached sink state");
                break;
            }
            for task in &def.tasks {
                if !self.running.is_set() {
                    break 'states;
                }
                if self.state == graph.credential_state {
                    if let Some(credential) = self.credentials.pop_front() {
                        self.current_credential = Some(credential);
                    }
                }
                let status = self.execute_task(task).await;
                if let Some(transition) =
                    def.transitions.iter().find(|t| t.condition.matches(status))
                {
                    tracing::debug!(
                        from = %self.state,
                        to = %transition.target,
                        terminal = transition.terminal,
                        "transition"
                    );
                    self.state = transition.target.clone();
                    if transition.terminal {
                        break 'states;
                    }
                    continue 'states;
                }
                // No transition matched: next task, same state.
            }
        }
    }

    /// Execute one task and record its sample. Returns the status code, or
    /// `None` on transport failure, as the input to transition evaluation.
    async fn execute_task(&mut self, task: &Task) -> Option<u16> {
        let start = Instant::now();
        let body = task.body.as_ref().map(|template| {
            let mut body = template.clone();
            if let Some(credential) = &self.current_credential {
                credential.merge_into(&mut body);
            }
            body
        });
        let outcome = self
            .capability
            .invoke(task.verb, &task.url, body.as_ref())
            .await;
        let elapsed = start.elapsed();
        let (status, error) = match outcome {
            Ok(code) => (Some(code), None),
            Err(err) => {
                tracing::debug!(task = %task.name, %err, "transport failure");
                (None, Some(err.to_string()))
            }
        };
        self.records.push(MetricRecord {
            state: self.state.clone(),
            task: task.name.clone(),
            status,
            elapsed,
            error,
        });
        status
    }
}
