use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;
use typed_builder::TypedBuilder;

use crate::capability::HttpCapability;
use crate::collector::{MetricsCollector, RunFlag};
use crate::graph::{Credential, GraphError, StateGraph};
use crate::metric::MetricRecord;
use crate::worker::Worker;

/// Supervises a population of [`Worker`]s until the collector's flag clears.
///
/// The pool is bounded: it holds one worker per credential in the pool, and
/// each finished worker is harvested and replaced by a fresh one. Every
/// worker receives its own full copy of the credential pool; credential reuse
/// across workers is the contract, not an accident.
#[derive(TypedBuilder)]
pub struct Orchestrator {
    graph: Arc<StateGraph>,
    capability: Arc<dyn HttpCapability>,
    credentials: Vec<Credential>,
    /// Pool size override. Defaults to the credential pool size (at least 1).
    #[builder(default, setter(strip_option))]
    population: Option<usize>,
}

impl Orchestrator {
    fn population(&self) -> usize {
        self.population
            .unwrap_or_else(|| self.credentials.len())
            .max(1)
    }

    fn spawn_worker(&self, running: &RunFlag) -> JoinHandle<Vec<MetricRecord>> {
        let mut worker = Worker::new(
            Arc::clone(&self.graph),
            Arc::clone(&self.capability),
            VecDeque::from(self.credentials.clone()),
            running.clone(),
        );
        tokio::spawn(async move {
            worker.run().await;
            worker.into_records()
        })
    }

    /// Run until the collector's flag clears.
    ///
    /// Validates the graph first, so configuration-shape errors surface
    /// before any worker is launched. On shutdown, in-flight workers are
    /// drained rather than abandoned: they observe the cleared flag at their
    /// next loop boundary and their records still reach the collector, so
    /// the final report loses nothing.
    pub async fn run(&self, collector: &mut MetricsCollector) -> Result<(), GraphError> {
        self.graph.validate()?;
        let running = collector.run_flag();
        let population = self.population();
        let mut pool: FuturesUnordered<JoinHandle<Vec<MetricRecord>>> = FuturesUnordered::new();

        tracing::info!(population, "starting worker pool");
        while running.is_set() {
            while pool.len() < population {
                pool.push(self.spawn_worker(&running));
            }
            match pool.next().await {
                Some(Ok(records)) => collector.add_metrics(records),
                Some(Err(err)) => tracing::warn!(%err, "worker task failed"),
                None => break,
            }
        }

        tracing::info!(in_flight = pool.len(), "draining in-flight workers");
        while let Some(finished) = pool.next().await {
            match finished {
                Ok(records) => collector.add_metrics(records),
                Err(err) => tracing::warn!(%err, "worker task failed"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use super::*;
    use crate::capability::TransportError;
    use crate::graph::{Condition, HttpVerb, StateDef, Task, Transition};

    /// Answers 200 to everything, counting calls, and clears the flag once
    /// enough calls have landed.
    struct CountingCapability {
        calls: AtomicUsize,
        stop_after: usize,
        flag: RunFlag,
    }

    #[async_trait]
    impl HttpCapability for CountingCapability {
        async fn invoke(
            &self,
            _verb: HttpVerb,
            _url: &str,
            _body: Option<&Map<String, Value>>,
        ) -> Result<u16, TransportError> {
            let total = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if total >= self.stop_after {
                self.flag.clear();
            }
            Ok(200)
        }
    }

    fn single_shot_graph() -> Arc<StateGraph> {
        Arc::new(StateGraph {
            initial_state: "RUN".to_string(),
            credential_state: "LOGIN".to_string(),
            states: [
                (
                    "RUN".to_string(),
                    StateDef {
                        tasks: vec![Task {
                            name: "probe".to_string(),
                            verb: HttpVerb::Get,
                            url: "https://example.com/probe".to_string(),
                            body: None,
                        }],
                        transitions: vec![Transition {
                            condition: Condition::Always,
                            target: "DONE".to_string(),
                            terminal: true,
                        }],
                    },
                ),
                ("DONE".to_string(), StateDef::default()),
            ]
            .into(),
        })
    }

    fn credential(user: &str) -> Credential {
        Credential::from_iter([("username".to_string(), user.to_string())])
    }

    #[tokio::test]
    async fn rejects_invalid_graph_before_launch() {
        let graph = Arc::new(StateGraph {
            initial_state: "MISSING".to_string(),
            credential_state: "LOGIN".to_string(),
            states: [("A".to_string(), StateDef::default())].into(),
        });
        let mut collector = MetricsCollector::new();
        let flag = collector.run_flag();
        let orchestrator = Orchestrator::builder()
            .graph(graph)
            .capability(Arc::new(CountingCapability {
                calls: AtomicUsize::new(0),
                stop_after: 1,
                flag,
            }))
            .credentials(vec![])
            .build();

        assert!(matches!(
            orchestrator.run(&mut collector).await,
            Err(GraphError::UnknownInitialState(_))
        ));
        assert!(collector.records().is_empty());
    }

    #[tokio::test]
    async fn harvests_every_record_exactly_once() {
        let mut collector = MetricsCollector::new();
        let capability = Arc::new(CountingCapability {
            calls: AtomicUsize::new(0),
            stop_after: 10,
            flag: collector.run_flag(),
        });
        let orchestrator = Orchestrator::builder()
            .graph(single_shot_graph())
            .capability(Arc::clone(&capability) as Arc<dyn HttpCapability>)
            .credentials(vec![credential("user1"), credential("user2")])
            .build();

        orchestrator.run(&mut collector).await.unwrap();

        // Every invocation produced exactly one record and the drain pass
        // harvested every worker, so the totals must line up.
        let total_calls = capability.calls.load(Ordering::SeqCst);
        assert!(total_calls >= 10);
        assert_eq!(collector.records().len(), total_calls);
        assert!(collector.records().iter().all(|r| r.status == Some(200)));
    }

    /// Workers replaced while others are still in flight: the pool keeps at
    /// most `population` workers live and still accounts for every record.
    #[tokio::test]
    async fn pool_size_override_caps_live_workers() {
        let mut collector = MetricsCollector::new();
        let capability = Arc::new(CountingCapability {
            calls: AtomicUsize::new(0),
            stop_after: 4,
            flag: collector.run_flag(),
        });
        let orchestrator = Orchestrator::builder()
            .graph(single_shot_graph())
            .capability(Arc::clone(&capability) as Arc<dyn HttpCapability>)
            .credentials(vec![credential("user1"), credential("user2")])
            .population(1)
            .build();

        orchestrator.run(&mut collector).await.unwrap();

        let total_calls = capability.calls.load(Ordering::SeqCst);
        assert_eq!(collector.records().len(), total_calls);
    }
}
