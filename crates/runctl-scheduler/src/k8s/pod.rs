// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod spec construction for run-executor workers.

use crate::{WorkerSpec, RUN_EXECUTOR_LABEL};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, Pod, PodSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub(super) struct PodParams {
    pub pod_name: String,
    pub namespace: String,
    pub run_id: String,
    pub spec: WorkerSpec,
    pub result_channel: String,
    pub log_channel: String,
    pub bus_addr: String,
    pub store_addr: String,
    pub credential_secret: Option<String>,
}

/// Build the one-shot run-executor pod for a single run.
pub(super) fn build_pod(params: &PodParams) -> Pod {
    let input_variables =
        serde_json::to_string(&params.spec.input_variables).unwrap_or_else(|_| "{}".to_string());
    let mut env = vec![
        env_var("RUN_ID", &params.run_id),
        env_var("RUNNABLE_ID", &params.spec.runnable_id),
        env_var("RUNNABLE_KIND", &params.spec.runnable_kind.to_string()),
        env_var("INPUT_VARIABLES", &input_variables),
        env_var("RESULT_CHANNEL", &params.result_channel),
        env_var("LOG_CHANNEL", &params.log_channel),
        env_var("RUNCTL_BUS_ADDR", &params.bus_addr),
        env_var("RUNCTL_STORE_ADDR", &params.store_addr),
    ];
    for (k, v) in &params.spec.env {
        env.push(env_var(k, v));
    }

    let mut labels = BTreeMap::new();
    labels.insert(RUN_EXECUTOR_LABEL.to_string(), "true".to_string());
    labels.insert("runctl.dev/run-id".to_string(), params.run_id.clone());

    let resources = ResourceRequirements {
        requests: Some(
            [
                ("cpu".to_string(), Quantity(params.spec.cpu_request.clone())),
                ("memory".to_string(), Quantity(params.spec.memory_request.clone())),
            ]
            .into_iter()
            .collect(),
        ),
        limits: Some(
            [
                ("cpu".to_string(), Quantity(params.spec.cpu_limit.clone())),
                ("memory".to_string(), Quantity(params.spec.memory_limit.clone())),
            ]
            .into_iter()
            .collect(),
        ),
        ..Default::default()
    };

    let mut container = Container {
        name: "run-executor".to_string(),
        image: Some(params.spec.image.clone()),
        env: Some(env),
        resources: Some(resources),
        ..Default::default()
    };

    if let Some(ref secret_name) = params.credential_secret {
        container.env_from = Some(vec![k8s_openapi::api::core::v1::EnvFromSource {
            secret_ref: Some(k8s_openapi::api::core::v1::SecretEnvSource {
                name: secret_name.clone(),
                optional: Some(true),
            }),
            ..Default::default()
        }]);
    }

    Pod {
        metadata: ObjectMeta {
            name: Some(params.pod_name.clone()),
            namespace: Some(params.namespace.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![container],
            restart_policy: Some("Never".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.to_string()), ..Default::default() }
}
