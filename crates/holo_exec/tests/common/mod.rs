//! Shared helpers for driver integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use holo_exec::{AttemptError, HostId, ObservedQueryEvent, QueryObserver, Session};

/// How a scripted host answers.
#[derive(Clone, Copy, Debug)]
pub struct Behavior {
    pub latency: Duration,
    /// Number of leading attempts on this host that fail.
    pub fail_first: u32,
}

impl Behavior {
    pub fn ok_after(ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(ms),
            fail_first: 0,
        }
    }

    pub fn fail_after(ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(ms),
            fail_first: u32::MAX,
        }
    }
}

#[derive(Default)]
struct SessionState {
    calls: Vec<HostId>,
    failures: HashMap<HostId, u32>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory session whose hosts sleep and then succeed or fail on a script.
pub struct ScriptedSession {
    hosts: Vec<HostId>,
    behaviors: HashMap<HostId, Behavior>,
    state: Mutex<SessionState>,
}

impl ScriptedSession {
    pub fn new(hosts: &[(&str, Behavior)]) -> Arc<Self> {
        Arc::new(Self {
            hosts: hosts.iter().map(|(name, _)| HostId::from(*name)).collect(),
            behaviors: hosts
                .iter()
                .map(|(name, behavior)| (HostId::from(*name), *behavior))
                .collect(),
            state: Mutex::new(SessionState::default()),
        })
    }

    /// Hosts in the order attempts were started.
    pub fn calls(&self) -> Vec<String> {
        let state = self.state.lock().expect("session state");
        state.calls.iter().map(|host| host.to_string()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().expect("session state").max_in_flight
    }
}

/// Decrements the in-flight gauge even when the attempt future is dropped.
struct InFlightGuard<'a>(&'a Mutex<SessionState>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.in_flight -= 1;
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    type Statement = String;

    fn hosts(&self) -> Vec<HostId> {
        self.hosts.clone()
    }

    async fn execute(&self, host: &HostId, _statement: &String) -> Result<u64, AttemptError> {
        let behavior = self.behaviors[host];
        let should_fail = {
            let mut state = self.state.lock().expect("session state");
            state.calls.push(host.clone());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            let failures = state.failures.entry(host.clone()).or_default();
            let fail = *failures < behavior.fail_first;
            if fail {
                *failures += 1;
            }
            fail
        };
        let _guard = InFlightGuard(&self.state);

        tokio::time::sleep(behavior.latency).await;
        if should_fail {
            Err(AttemptError::failed(host, "scripted failure"))
        } else {
            Ok(1)
        }
    }
}

/// Observer that keeps every event it was handed.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedQueryEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObservedQueryEvent> {
        self.events.lock().expect("events").clone()
    }
}

impl QueryObserver for RecordingObserver {
    fn on_event(&self, event: &ObservedQueryEvent) {
        self.events.lock().expect("events").push(event.clone());
    }
}
