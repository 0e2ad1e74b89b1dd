//! The inspection pipeline: fetch, select, project

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use nplist_k8s::PolicySource;
use nplist_policy::{DisplayRow, project, select_policies};

/// Result of inspecting one pod
#[derive(Clone, Debug, Serialize)]
pub struct Inspection {
    pub namespace: String,
    pub pod: String,
    pub rows: Vec<DisplayRow>,
}

/// Resolve the network policy rules that apply to a pod
pub async fn inspect<S: PolicySource>(
    source: &S,
    namespace: &str,
    pod_name: &str,
) -> Result<Inspection> {
    let pod = source.get_pod(namespace, pod_name).await?;
    let labels = pod.metadata.labels.unwrap_or_default();
    debug!(namespace, pod = pod_name, labels = ?labels, "fetched pod");

    let policies = source.list_network_policies(namespace).await?;
    let total = policies.len();

    let selected = select_policies(&labels, policies)?;
    if selected.is_empty() {
        debug!(namespace, pod = pod_name, total, "no network policy selects pod");
    }
    debug!(
        total,
        ingress = selected.ingress.len(),
        egress = selected.egress.len(),
        "selected network policies"
    );

    Ok(Inspection {
        namespace: pod.metadata.namespace.unwrap_or_else(|| namespace.to_string()),
        pod: pod.metadata.name.unwrap_or_else(|| pod_name.to_string()),
        rows: project(&selected.ingress, &selected.egress),
    })
}
