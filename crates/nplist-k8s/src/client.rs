use std::path::Path;

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::Api;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use crate::namespace::resolve_namespace;

/// Read access to the objects an inspection needs
#[allow(async_fn_in_trait)]
pub trait PolicySource {
    /// Fetch a single pod by name
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    /// List every network policy in a namespace, in API order
    async fn list_network_policies(&self, namespace: &str) -> Result<Vec<NetworkPolicy>>;
}

/// Kubernetes client wrapper
pub struct KubeClient {
    client: kube::Client,
    default_namespace: String,
}

impl KubeClient {
    /// Create a client from a kubeconfig file.
    ///
    /// Without a path the standard location is used (`KUBECONFIG`, then
    /// `~/.kube/config`). Without a context the kubeconfig's current context is
    /// used.
    pub async fn new(kubeconfig_path: Option<&Path>, context: Option<&str>) -> Result<Self> {
        let kubeconfig = match kubeconfig_path {
            Some(path) => Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?,
            None => {
                Kubeconfig::read().context("Failed to read kubeconfig. Is kubectl configured?")?
            }
        };

        let default_namespace = resolve_namespace(&kubeconfig, context);
        let context_label = context
            .or(kubeconfig.current_context.as_deref())
            .unwrap_or("<none>")
            .to_string();

        let config = kube::Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.map(str::to_string),
                ..Default::default()
            },
        )
        .await
        .with_context(|| format!("Failed to create config for context: {}", context_label))?;

        let client = kube::Client::try_from(config)
            .with_context(|| format!("Failed to create client for context: {}", context_label))?;

        debug!(context = %context_label, namespace = %default_namespace, "kubernetes client ready");

        Ok(Self {
            client,
            default_namespace,
        })
    }

    /// Namespace of the selected kubeconfig context
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}

impl PolicySource for KubeClient {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        pods.get(name).await.with_context(|| {
            format!("Failed to get pod '{}' in namespace '{}'", name, namespace)
        })
    }

    async fn list_network_policies(&self, namespace: &str) -> Result<Vec<NetworkPolicy>> {
        let policies: Api<NetworkPolicy> = Api::namespaced(self.client.clone(), namespace);
        let list = policies
            .list(&ListParams::default())
            .await
            .with_context(|| format!("Failed to list network policies in {}", namespace))?;

        debug!(namespace, count = list.items.len(), "listed network policies");
        Ok(list.items)
    }
}
