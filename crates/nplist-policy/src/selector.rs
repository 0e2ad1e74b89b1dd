use std::collections::BTreeMap;
use std::sync::LazyLock;

use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use kube::ResourceExt;
use kube::core::{Selector, SelectorExt};
use regex::Regex;
use tracing::debug;

use crate::error::Error;
use nplist_types::Direction;

/// Label names and values: alphanumeric at both ends, `-_.` inside
static LABEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("valid label name regex")
});

/// DNS subdomain allowed as a label key prefix
static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid dns subdomain regex")
});

const MAX_LABEL_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

/// Policies that select a pod, split by the direction they govern
#[derive(Clone, Debug, Default)]
pub struct SelectedPolicies {
    pub ingress: Vec<NetworkPolicy>,
    pub egress: Vec<NetworkPolicy>,
}

impl SelectedPolicies {
    pub fn is_empty(&self) -> bool {
        self.ingress.is_empty() && self.egress.is_empty()
    }
}

/// Check whether a pod's labels satisfy a policy's pod selector.
///
/// An empty selector matches every pod. `policy` names the owning policy in
/// the error returned for a malformed selector.
pub fn matches(
    labels: &BTreeMap<String, String>,
    selector: &LabelSelector,
    policy: &str,
) -> Result<bool, Error> {
    if selects_all(selector) {
        return Ok(true);
    }

    for (key, value) in selector.match_labels.iter().flatten() {
        validate_key(key)
            .and_then(|_| validate_value(value))
            .map_err(|reason| Error::invalid_selector(policy, reason))?;
    }
    for requirement in selector.match_expressions.iter().flatten() {
        validate_requirement(requirement)
            .map_err(|reason| Error::invalid_selector(policy, reason))?;
    }

    let selector =
        Selector::try_from(selector.clone()).map_err(|e| Error::invalid_selector(policy, e))?;
    Ok(selector.matches(labels))
}

/// Split the policies selecting a pod into ingress and egress sets.
///
/// A policy lands in a set only when it also declares that direction in its
/// `policyTypes`. Listing order is preserved. The first malformed selector
/// aborts the whole selection.
pub fn select_policies(
    labels: &BTreeMap<String, String>,
    policies: impl IntoIterator<Item = NetworkPolicy>,
) -> Result<SelectedPolicies, Error> {
    let mut selected = SelectedPolicies::default();

    for policy in policies {
        let name = policy.name_any();
        let Some(spec) = &policy.spec else {
            debug!(policy = %name, "skipping network policy without spec");
            continue;
        };

        if !matches(labels, &spec.pod_selector, &name)? {
            debug!(policy = %name, "network policy does not select pod");
            continue;
        }

        let governs = |direction: Direction| {
            spec.policy_types
                .iter()
                .flatten()
                .filter_map(|t| {
                    let parsed = Direction::from_policy_type(t);
                    if parsed.is_none() {
                        debug!(policy = %name, policy_type = %t, "ignoring unknown policy type");
                    }
                    parsed
                })
                .any(|d| d == direction)
        };
        let ingress = governs(Direction::Ingress);
        let egress = governs(Direction::Egress);
        debug!(policy = %name, ingress, egress, "network policy selects pod");

        match (ingress, egress) {
            (true, true) => {
                selected.ingress.push(policy.clone());
                selected.egress.push(policy);
            }
            (true, false) => selected.ingress.push(policy),
            (false, true) => selected.egress.push(policy),
            (false, false) => {}
        }
    }

    Ok(selected)
}

fn selects_all(selector: &LabelSelector) -> bool {
    selector.match_labels.as_ref().is_none_or(|l| l.is_empty())
        && selector.match_expressions.as_ref().is_none_or(|e| e.is_empty())
}

/// Apply the API server's rules for set-based requirements
fn validate_requirement(requirement: &LabelSelectorRequirement) -> Result<(), String> {
    validate_key(&requirement.key)?;
    let values = requirement.values.as_deref().unwrap_or_default();
    for value in values {
        validate_value(value)?;
    }
    match requirement.operator.as_str() {
        "In" | "NotIn" if values.is_empty() => Err(format!(
            "operator {} on key {} requires at least one value",
            requirement.operator, requirement.key
        )),
        "Exists" | "DoesNotExist" if !values.is_empty() => Err(format!(
            "operator {} on key {} must not have values",
            requirement.operator, requirement.key
        )),
        "In" | "NotIn" | "Exists" | "DoesNotExist" => Ok(()),
        other => Err(format!(
            "unknown operator {} on key {}",
            other, requirement.key
        )),
    }
}

/// A label key is `[prefix/]name`, the prefix being a DNS subdomain
fn validate_key(key: &str) -> Result<(), String> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix
        && (prefix.len() > MAX_PREFIX_LEN || !DNS_SUBDOMAIN.is_match(prefix))
    {
        return Err(format!("invalid label key prefix in {:?}", key));
    }
    if name.len() > MAX_LABEL_NAME_LEN || !LABEL_NAME.is_match(name) {
        return Err(format!("invalid label key {:?}", key));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > MAX_LABEL_NAME_LEN || !LABEL_NAME.is_match(value) {
        return Err(format!("invalid label value {:?}", value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::networking::v1::NetworkPolicySpec;
    use kube::api::ObjectMeta;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn selector_eq(pairs: &[(&str, &str)]) -> LabelSelector {
        LabelSelector {
            match_labels: Some(labels(pairs)),
            match_expressions: None,
        }
    }

    fn selector_expr(key: &str, operator: &str, values: Option<&[&str]>) -> LabelSelector {
        LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: key.to_string(),
                operator: operator.to_string(),
                values: values.map(|v| v.iter().map(|s| s.to_string()).collect()),
            }]),
        }
    }

    fn policy(name: &str, selector: LabelSelector, types: &[&str]) -> NetworkPolicy {
        NetworkPolicy {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns1".to_string()),
                ..Default::default()
            },
            spec: Some(NetworkPolicySpec {
                pod_selector: selector,
                policy_types: Some(types.iter().map(|t| t.to_string()).collect()),
                ..Default::default()
            }),
        }
    }

    fn names(policies: &[NetworkPolicy]) -> Vec<String> {
        policies.iter().map(|p| p.name_any()).collect()
    }

    #[test]
    fn test_empty_selector_matches_any_pod() {
        let empty = LabelSelector::default();
        assert!(matches(&labels(&[]), &empty, "p").unwrap());
        assert!(matches(&labels(&[("app", "api")]), &empty, "p").unwrap());

        let empty_map = selector_eq(&[]);
        assert!(matches(&labels(&[("app", "api")]), &empty_map, "p").unwrap());
    }

    #[test]
    fn test_match_labels_is_conjunction() {
        let pod = labels(&[("app", "api"), ("tier", "backend")]);
        assert!(matches(&pod, &selector_eq(&[("app", "api")]), "p").unwrap());
        assert!(matches(&pod, &selector_eq(&[("app", "api"), ("tier", "backend")]), "p").unwrap());
        assert!(!matches(&pod, &selector_eq(&[("app", "api"), ("tier", "frontend")]), "p").unwrap());
        assert!(!matches(&pod, &selector_eq(&[("env", "prod")]), "p").unwrap());
    }

    #[test]
    fn test_set_based_expressions() {
        let pod = labels(&[("app", "api"), ("tier", "backend")]);
        assert!(matches(&pod, &selector_expr("tier", "In", Some(&["backend", "worker"])), "p").unwrap());
        assert!(!matches(&pod, &selector_expr("tier", "NotIn", Some(&["backend"])), "p").unwrap());
        assert!(matches(&pod, &selector_expr("app", "Exists", None), "p").unwrap());
        assert!(matches(&pod, &selector_expr("env", "DoesNotExist", None), "p").unwrap());
        assert!(!matches(&pod, &selector_expr("env", "Exists", None), "p").unwrap());
    }

    #[test]
    fn test_malformed_selector_is_an_error() {
        let pod = labels(&[("app", "api")]);

        let err = matches(&pod, &selector_expr("app", "Matches", Some(&["api"])), "broken").unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { ref policy, .. } if policy == "broken"));

        assert!(matches(&pod, &selector_expr("app", "In", Some(&[])), "p").is_err());
        assert!(matches(&pod, &selector_expr("app", "In", None), "p").is_err());
        assert!(matches(&pod, &selector_expr("app", "Exists", Some(&["api"])), "p").is_err());
    }

    #[test]
    fn test_invalid_label_syntax_is_an_error() {
        let pod = labels(&[]);

        let err = matches(&pod, &selector_eq(&[("bad key!", "v v")]), "typo").unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { ref policy, .. } if policy == "typo"));

        assert!(matches(&pod, &selector_eq(&[("app", "v v")]), "p").is_err());
        assert!(matches(&pod, &selector_eq(&[("Not_A.Domain/app", "api")]), "p").is_err());
        let long_key = "a".repeat(64);
        assert!(matches(&pod, &selector_eq(&[(long_key.as_str(), "api")]), "p").is_err());
        assert!(matches(&pod, &selector_expr("-tier", "Exists", None), "p").is_err());
        assert!(matches(&pod, &selector_expr("tier", "In", Some(&["ok", "not ok"])), "p").is_err());
    }

    #[test]
    fn test_valid_label_syntax_is_accepted() {
        let pod = labels(&[("app.kubernetes.io/name", "api"), ("track", "")]);

        assert!(matches(&pod, &selector_eq(&[("app.kubernetes.io/name", "api")]), "p").unwrap());
        assert!(matches(&pod, &selector_eq(&[("track", "")]), "p").unwrap());
        assert!(!matches(&pod, &selector_eq(&[("Tier_1.x", "Blue-2")]), "p").unwrap());
    }

    #[test]
    fn test_select_policies_splits_by_policy_type() {
        let pod = labels(&[("app", "api")]);
        let policies = vec![
            policy("ingress-only", selector_eq(&[("app", "api")]), &["Ingress"]),
            policy("egress-only", LabelSelector::default(), &["Egress"]),
            policy("both", selector_eq(&[("app", "api")]), &["Ingress", "Egress"]),
            policy("other-pod", selector_eq(&[("app", "web")]), &["Ingress", "Egress"]),
        ];

        let selected = select_policies(&pod, policies).unwrap();
        assert_eq!(names(&selected.ingress), vec!["ingress-only", "both"]);
        assert_eq!(names(&selected.egress), vec!["egress-only", "both"]);
    }

    #[test]
    fn test_undeclared_direction_is_excluded_even_with_rules() {
        let pod = labels(&[("app", "api")]);
        let mut egress_typed = policy("egress-typed", LabelSelector::default(), &["Egress"]);
        if let Some(spec) = egress_typed.spec.as_mut() {
            spec.ingress = Some(vec![Default::default()]);
        }
        let mut untyped = policy("untyped", LabelSelector::default(), &[]);
        if let Some(spec) = untyped.spec.as_mut() {
            spec.policy_types = None;
            spec.ingress = Some(vec![Default::default()]);
        }

        let selected = select_policies(&pod, vec![egress_typed, untyped]).unwrap();
        assert!(selected.ingress.is_empty());
        assert_eq!(names(&selected.egress), vec!["egress-typed"]);
    }

    #[test]
    fn test_lowercase_policy_type_is_not_a_direction() {
        let pod = labels(&[("app", "api")]);
        let lowercase = policy("lowercase", LabelSelector::default(), &["ingress", "egress"]);

        let selected = select_policies(&pod, vec![lowercase]).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_select_policies_aborts_on_malformed_selector() {
        let pod = labels(&[("app", "api")]);
        let policies = vec![
            policy("fine", LabelSelector::default(), &["Ingress"]),
            policy("broken", selector_expr("app", "Bogus", None), &["Ingress"]),
        ];

        let err = select_policies(&pod, policies).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_policy_without_spec_selects_nothing() {
        let pod = labels(&[("app", "api")]);
        let mut bare = policy("bare", LabelSelector::default(), &["Ingress"]);
        bare.spec = None;

        let selected = select_policies(&pod, vec![bare]).unwrap();
        assert!(selected.is_empty());
    }
}
