use kube::config::Kubeconfig;

/// Namespace used when the kubeconfig context does not set one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resolve the namespace of a kubeconfig context.
///
/// Uses `context` when given, otherwise the kubeconfig's current context.
/// Falls back to [`DEFAULT_NAMESPACE`] when the context is unknown or sets no
/// namespace.
pub fn resolve_namespace(kubeconfig: &Kubeconfig, context: Option<&str>) -> String {
    let Some(context_name) = context.or(kubeconfig.current_context.as_deref()) else {
        return DEFAULT_NAMESPACE.to_string();
    };

    kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .and_then(|c| c.context.as_ref())
        .and_then(|c| c.namespace.clone())
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}
