//! The classic login/fetch scenario: every worker logs in with a credential
//! from the pool, fetches data, and completes; any non-200 answer sends it to
//! a terminal failure state. Run until ctrl-c, then print what was collected.

use std::sync::Arc;

use harrier::{
    Credential, MetricsCollector, Orchestrator, ReqwestCapability, Reporter, StateGraph,
    StdoutReporter,
};

const GRAPH: &str = r#"{
    "initial_state": "LOGIN",
    "states": {
        "LOGIN": {
            "tasks": [
                {
                    "name": "login",
                    "verb": "POST",
                    "url": "https://example.com/login",
                    "body": {}
                }
            ],
            "transitions": [
                {"condition": {"status_is": 200}, "target": "FETCH_DATA"},
                {"condition": {"status_not": 200}, "target": "LOGIN_FAILED", "terminal": true}
            ]
        },
        "FETCH_DATA": {
            "tasks": [
                {
                    "name": "fetch_data",
                    "verb": "GET",
                    "url": "https://example.com/data"
                }
            ],
            "transitions": [
                {"condition": {"status_is": 200}, "target": "COMPLETE"},
                {"condition": {"status_not": 200}, "target": "ERROR", "terminal": true}
            ]
        },
        "LOGIN_FAILED": {},
        "ERROR": {},
        "COMPLETE": {}
    }
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let graph = StateGraph::from_json(GRAPH)?;
    let credentials: Vec<Credential> = [
        [("username", "user1"), ("password", "pass1")],
        [("username", "user2"), ("password", "pass2")],
        [("username", "user3"), ("password", "pass3")],
    ]
    .into_iter()
    .map(|pairs| {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    })
    .collect();

    let mut collector = MetricsCollector::new();
    let flag = collector.run_flag();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        flag.clear();
    });

    Orchestrator::builder()
        .graph(Arc::new(graph))
        .capability(Arc::new(ReqwestCapability::new()))
        .credentials(credentials)
        .build()
        .run(&mut collector)
        .await?;

    StdoutReporter.report(collector.records()).await?;
    Ok(())
}
