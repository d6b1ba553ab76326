//! Scripted collaborators for exercising the runner without a cluster or a metrics backend.

use crate::deployment::{Deployer, DeployerError, DeploymentSpec, WorkloadHandle, WorkloadStatus};
use crate::executor::{BackendError, MetricBackend, QueryValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::time::Instant;

type Script = dyn Fn(&str, usize) -> Result<QueryValue, BackendError> + Send + Sync;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub query: String,
    pub at: Instant,
}

/// A [MetricBackend] that answers from a script.
///
/// The script receives the query and the number of queries made before it.
pub struct ScriptedBackend {
    script: Box<Script>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedQuery>>,
}

impl ScriptedBackend {
    pub fn new(
        script: impl Fn(&str, usize) -> Result<QueryValue, BackendError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn constant(value: QueryValue) -> Self {
        Self::new(move |_, _| Ok(value.clone()))
    }

    /// Take this long to answer every query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.lock().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.query.clone()).collect()
    }
}

#[async_trait]
impl MetricBackend for ScriptedBackend {
    async fn query(&self, query: &str, _timeout: Duration) -> Result<QueryValue, BackendError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(RecordedQuery {
                query: query.to_string(),
                at: Instant::now(),
            });
            calls.len() - 1
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.script)(query, index)
    }
}

#[derive(Debug, Default)]
struct FakeDeployerState {
    live: BTreeSet<String>,
    created: Vec<String>,
    deleted: Vec<String>,
    polls: BTreeMap<String, u32>,
}

/// An in-memory [Deployer] with configurable failures.
///
/// Workloads become ready on the poll numbered `ready_after` (counting from zero) and report
/// every desired replica from then on.
#[derive(Debug, Default)]
pub struct FakeDeployer {
    ready_after: u32,
    not_found_for: u32,
    failing_creates: BTreeSet<String>,
    failing_gets: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    never_ready: BTreeSet<String>,
    state: Mutex<FakeDeployerState>,
}

impl FakeDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_after(mut self, polls: u32) -> Self {
        self.ready_after = polls;
        self
    }

    /// Report the first `polls` lookups of each workload as not found.
    pub fn not_found_for(mut self, polls: u32) -> Self {
        self.not_found_for = polls;
        self
    }

    pub fn fail_create(mut self, name: &str) -> Self {
        self.failing_creates.insert(name.to_string());
        self
    }

    pub fn fail_get(mut self, name: &str) -> Self {
        self.failing_gets.insert(name.to_string());
        self
    }

    pub fn fail_delete(mut self, name: &str) -> Self {
        self.failing_deletes.insert(name.to_string());
        self
    }

    pub fn never_ready(mut self, name: &str) -> Self {
        self.never_ready.insert(name.to_string());
        self
    }

    /// Names of successfully created workloads, in order.
    pub fn created(&self) -> Vec<String> {
        self.state.lock().created.clone()
    }

    /// Names passed to delete, in order, including deletes that failed.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    /// Workloads that were created and not yet deleted.
    pub fn live(&self) -> Vec<String> {
        self.state.lock().live.iter().cloned().collect()
    }

    pub fn polls(&self, name: &str) -> u32 {
        self.state.lock().polls.get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Deployer for FakeDeployer {
    async fn create(&self, spec: &DeploymentSpec) -> Result<WorkloadHandle, DeployerError> {
        if self.failing_creates.contains(&spec.name) {
            return Err(anyhow::anyhow!("admission denied for {}", spec.name).into());
        }

        let mut state = self.state.lock();
        if !state.live.insert(spec.name.clone()) {
            return Err(anyhow::anyhow!("{} already exists", spec.name).into());
        }
        state.created.push(spec.name.clone());

        let instances = (0..spec.replicas)
            .map(|i| format!("{}-{i}", spec.name))
            .collect();
        Ok(WorkloadHandle::for_spec(spec).with_instances(instances))
    }

    async fn get(&self, handle: &WorkloadHandle) -> Result<WorkloadStatus, DeployerError> {
        if self.failing_gets.contains(&handle.name) {
            return Err(anyhow::anyhow!("lookup of {} was refused", handle.name).into());
        }

        let mut state = self.state.lock();
        let poll = {
            let polls = state.polls.entry(handle.name.clone()).or_default();
            *polls += 1;
            *polls - 1
        };

        if !state.live.contains(&handle.name) || poll < self.not_found_for {
            return Err(DeployerError::NotFound(handle.name.clone()));
        }

        let ready_replicas = if self.never_ready.contains(&handle.name) || poll < self.ready_after {
            0
        } else {
            handle.replicas
        };

        Ok(WorkloadStatus { ready_replicas })
    }

    async fn delete(&self, handle: &WorkloadHandle) -> Result<(), DeployerError> {
        let mut state = self.state.lock();
        state.deleted.push(handle.name.clone());

        if self.failing_deletes.contains(&handle.name) {
            return Err(anyhow::anyhow!("delete of {} was refused", handle.name).into());
        }

        if state.live.remove(&handle.name) {
            Ok(())
        } else {
            Err(DeployerError::NotFound(handle.name.clone()))
        }
    }
}
