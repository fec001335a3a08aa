use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while loading or validating a [`StateGraph`].
///
/// Configuration-shape problems fail fast at startup, before any worker is
/// launched.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to parse state graph: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("initial state `{0}` is not defined in the graph")]
    UnknownInitialState(String),
    #[error("state `{state}` has a transition to unknown state `{target}`")]
    UnknownTarget { state: String, target: String },
}

/// HTTP verb a [`Task`] is bound to, fixed at configuration-load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// Declarative predicate over the outcome of a task execution.
///
/// The outcome is an optional status code: `None` means the transport failed
/// and no response was received. Note that `StatusNot` matches an absent
/// status — "anything but 200" includes "no response at all".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The response status equals the given code.
    StatusIs(u16),
    /// The response status differs from the given code, or is absent.
    StatusNot(u16),
    /// The response status falls within `min..=max`.
    StatusBetween { min: u16, max: u16 },
    /// The transport failed and there is no status.
    Failed,
    /// Matches any outcome.
    Always,
}

impl Condition {
    pub fn matches(&self, status: Option<u16>) -> bool {
        match (self, status) {
            (Condition::StatusIs(code), outcome) => outcome == Some(*code),
            (Condition::StatusNot(code), outcome) => outcome != Some(*code),
            (Condition::StatusBetween { min, max }, Some(code)) => {
                (*min..=*max).contains(&code)
            }
            (Condition::StatusBetween { .. }, None) => false,
            (Condition::Failed, outcome) => outcome.is_none(),
            (Condition::Always, _) => true,
        }
    }
}

/// One HTTP operation bound to a state. Immutable, shared read-only by every
/// worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub verb: HttpVerb,
    pub url: String,
    /// Body template. A worker holding a credential merges the credential's
    /// fields into a copy of this template before sending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Map<String, Value>>,
}

/// A rule mapping a task outcome to a next state, evaluated in declared order,
/// first match wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub condition: Condition,
    pub target: String,
    /// A terminal transition ends the worker's run immediately when taken.
    #[serde(default)]
    pub terminal: bool,
}

/// One named state: an ordered task list and an ordered transition list.
///
/// A state with neither tasks nor transitions is a terminal sink.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Opaque key/value secret consumed once per use from a worker's private
/// queue. A value type: each worker gets its own copies, never shared
/// references.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(BTreeMap<String, String>);

impl Credential {
    /// Merge this credential's fields into a request body, overwriting any
    /// colliding template keys.
    pub fn merge_into(&self, body: &mut Map<String, Value>) {
        for (key, value) in &self.0 {
            body.insert(key.clone(), Value::String(value.clone()));
        }
    }
}

impl FromIterator<(String, String)> for Credential {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn default_credential_state() -> String {
    "LOGIN".to_string()
}

/// The declarative set of named states, their tasks, and transition rules.
///
/// Built once at startup and never mutated; workers share it read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateGraph {
    pub initial_state: String,
    /// The state in which a worker pops the next credential off its queue
    /// before executing tasks.
    #[serde(default = "default_credential_state")]
    pub credential_state: String,
    pub states: HashMap<String, StateDef>,
}

impl StateGraph {
    /// Parse a graph from its JSON carrier and validate it.
    pub fn from_json(src: &str) -> Result<Self, GraphError> {
        let graph: Self = serde_json::from_str(src)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn state(&self, id: &str) -> Option<&StateDef> {
        self.states.get(id)
    }

    /// Check that the initial state and every transition target name an
    /// existing state.
    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.states.contains_key(&self.initial_state) {
            return Err(GraphError::UnknownInitialState(self.initial_state.clone()));
        }
        for (id, def) in &self.states {
            for transition in &def.transitions {
                if !self.states.contains_key(&transition.target) {
                    return Err(GraphError::UnknownTarget {
                        state: id.clone(),
                        target: transition.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> StateDef {
        StateDef::default()
    }

    fn graph_with(states: Vec<(&str, StateDef)>) -> StateGraph {
        StateGraph {
            initial_state: "A".to_string(),
            credential_state: "LOGIN".to_string(),
            states: states
                .into_iter()
                .map(|(id, def)| (id.to_string(), def))
                .collect(),
        }
    }

    #[test]
    fn status_is_requires_exact_match() {
        assert!(Condition::StatusIs(200).matches(Some(200)));
        assert!(!Condition::StatusIs(200).matches(Some(500)));
        assert!(!Condition::StatusIs(200).matches(None));
    }

    #[test]
    fn status_not_matches_absent_status() {
        assert!(Condition::StatusNot(200).matches(Some(500)));
        assert!(Condition::StatusNot(200).matches(None));
        assert!(!Condition::StatusNot(200).matches(Some(200)));
    }

    #[test]
    fn status_between_is_inclusive_and_never_matches_failures() {
        let cond = Condition::StatusBetween { min: 200, max: 299 };
        assert!(cond.matches(Some(200)));
        assert!(cond.matches(Some(299)));
        assert!(!cond.matches(Some(300)));
        assert!(!cond.matches(None));
    }

    #[test]
    fn failed_only_matches_missing_status() {
        assert!(Condition::Failed.matches(None));
        assert!(!Condition::Failed.matches(Some(500)));
    }

    #[test]
    fn validate_rejects_unknown_initial_state() {
        let graph = StateGraph {
            initial_state: "MISSING".to_string(),
            credential_state: "LOGIN".to_string(),
            states: HashMap::from([("A".to_string(), sink())]),
        };
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UnknownInitialState(name)) if name == "MISSING"
        ));
    }

    #[test]
    fn validate_rejects_unknown_transition_target() {
        let graph = graph_with(vec![(
            "A",
            StateDef {
                tasks: vec![],
                transitions: vec![Transition {
                    condition: Condition::Always,
                    target: "GONE".to_string(),
                    terminal: false,
                }],
            },
        )]);
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UnknownTarget { state, target })
                if state == "A" && target == "GONE"
        ));
    }

    #[test]
    fn parses_json_carrier() {
        let graph = StateGraph::from_json(
            r#"{
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
                            {"condition": {"status_is": 200}, "target": "COMPLETE"},
                            {"condition": {"status_not": 200}, "target": "LOGIN_FAILED", "terminal": true}
                        ]
                    },
                    "COMPLETE": {},
                    "LOGIN_FAILED": {}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(graph.initial_state, "LOGIN");
        // Unspecified credential state falls back to the LOGIN convention.
        assert_eq!(graph.credential_state, "LOGIN");
        let login = graph.state("LOGIN").unwrap();
        assert_eq!(login.tasks.len(), 1);
        assert_eq!(login.tasks[0].verb, HttpVerb::Post);
        assert_eq!(login.transitions.len(), 2);
        assert!(login.transitions[1].terminal);
    }

    #[test]
    fn credential_fields_overwrite_template_keys() {
        let cred = Credential::from_iter([
            ("username".to_string(), "user1".to_string()),
            ("password".to_string(), "pass1".to_string()),
        ]);
        let mut body = Map::new();
        body.insert("username".to_string(), Value::String("template".to_string()));
        body.insert("device".to_string(), Value::String("ci".to_string()));
        cred.merge_into(&mut body);

        assert_eq!(body["username"], Value::String("user1".to_string()));
        assert_eq!(body["password"], Value::String("pass1".to_string()));
        assert_eq!(body["device"], Value::String("ci".to_string()));
    }
}
