//! Kubernetes client for nplist
//!
//! This crate provides the cluster access nplist needs: reading the
//! kubeconfig, resolving the namespace to inspect, fetching a pod and listing
//! the network policies of its namespace.

mod client;
mod namespace;

pub use client::{KubeClient, PolicySource};
pub use namespace::{DEFAULT_NAMESPACE, resolve_namespace};
