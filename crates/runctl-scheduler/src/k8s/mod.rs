// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes cluster scheduler adapter — one `Pod` per run.
//!
//! Idempotency: the pod name is derived deterministically from the
//! caller-supplied `request_id`, so a retried `launch` either finds the
//! existing pod (and returns its name again) or creates it.

mod pod;

use crate::{ClusterSchedulerAdapter, SchedulerError, WorkerResource, WorkerSpec, WorkerState, RUN_EXECUTOR_LABEL};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, PostParams};
use kube::Client;
use runctl_core::channel::{log_channel, result_channel};

/// Agent/team worker image, credential secret, bus/store addresses: these
/// are operator-configured once per cluster, not per run.
#[derive(Debug, Clone)]
pub struct KubernetesConfig {
    pub namespace: String,
    pub credential_secret: Option<String>,
    pub bus_addr: String,
    pub store_addr: String,
}

pub struct KubernetesAdapter {
    client: Client,
    config: KubernetesConfig,
}

impl KubernetesAdapter {
    pub async fn new(config: KubernetesConfig) -> Result<Self, SchedulerError> {
        let client = Client::try_default()
            .await
            .map_err(|e| SchedulerError::Permanent(format!("failed to create kube client: {e}")))?;
        Ok(Self { client, config })
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.config.namespace)
    }

    fn pod_name(request_id: &str) -> String {
        // Kubernetes names must be <= 253 chars and DNS-label-ish; request
        // ids here are short launch tokens, so this is safe without
        // truncation or hashing.
        format!("runctl-{request_id}")
    }
}

#[async_trait]
impl ClusterSchedulerAdapter for KubernetesAdapter {
    async fn launch(&self, spec: WorkerSpec, request_id: &str) -> Result<String, SchedulerError> {
        let pod_name = Self::pod_name(request_id);
        let pods = self.pods();

        if pods.get(&pod_name).await.is_ok() {
            tracing::debug!(%pod_name, "launch is idempotent, pod already exists");
            return Ok(pod_name);
        }

        let run_id = spec.run_id.to_string();
        let params = pod::PodParams {
            pod_name: pod_name.clone(),
            namespace: self.config.namespace.clone(),
            result_channel: result_channel(spec.run_id),
            log_channel: log_channel(spec.run_id),
            bus_addr: self.config.bus_addr.clone(),
            store_addr: self.config.store_addr.clone(),
            credential_secret: self.config.credential_secret.clone(),
            run_id,
            spec,
        };
        let pod_spec = pod::build_pod(&params);

        tracing::info!(%pod_name, namespace = %self.config.namespace, "creating run-executor pod");
        match pods.create(&PostParams::default(), &pod_spec).await {
            Ok(_) => Ok(pod_name),
            // A concurrent idempotent retry may have raced us to creation.
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(pod_name),
            Err(e) => Err(classify(e)),
        }
    }

    async fn inspect(&self, worker_handle: &str) -> Result<WorkerState, SchedulerError> {
        match self.pods().get(worker_handle).await {
            Ok(pod) => Ok(phase_to_state(&pod)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(WorkerState::Unknown),
            Err(e) => Err(classify(e)),
        }
    }

    async fn delete(&self, worker_handle: &str) -> Result<(), SchedulerError> {
        match self.pods().delete(worker_handle, &Default::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(classify(e)),
        }
    }

    async fn list_run_executors(&self) -> Result<Vec<WorkerResource>, SchedulerError> {
        let lp = ListParams::default().labels(&format!("{RUN_EXECUTOR_LABEL}=true"));
        let pods = self.pods().list(&lp).await.map_err(classify)?;
        Ok(pods
            .items
            .iter()
            .filter_map(|pod| {
                let name = pod.metadata.name.clone()?;
                let created_at = pod
                    .metadata
                    .creation_timestamp
                    .as_ref()
                    .map(|t| t.0)
                    .unwrap_or_else(chrono::Utc::now);
                Some(WorkerResource { handle: name, state: phase_to_state(pod), created_at })
            })
            .collect())
    }
}

fn phase_to_state(pod: &Pod) -> WorkerState {
    match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
        Some("Succeeded") => WorkerState::Succeeded,
        Some("Failed") => WorkerState::Failed,
        Some("Running") | Some("Pending") => WorkerState::Active,
        _ => WorkerState::Unknown,
    }
}

fn classify(e: kube::Error) -> SchedulerError {
    match &e {
        kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429 => {
            SchedulerError::Transient(api_err.message.clone())
        }
        _ => SchedulerError::Permanent(e.to_string()),
    }
}
