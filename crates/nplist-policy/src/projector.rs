use k8s_openapi::api::networking::v1::{NetworkPolicy, NetworkPolicyPeer, NetworkPolicyPort};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use tracing::debug;

use nplist_types::{Action, Direction, DisplayRow, WILDCARD};

/// Flatten the rules of the selected policies into display rows.
///
/// Ingress rows come first, then egress rows. Policy order and rule order are
/// kept as given. A policy whose rule list for a direction is absent yields a
/// single deny-all row for that direction.
pub fn project(ingress: &[NetworkPolicy], egress: &[NetworkPolicy]) -> Vec<DisplayRow> {
    let mut rows = Vec::new();
    for policy in ingress {
        project_policy(policy, Direction::Ingress, &mut rows);
    }
    for policy in egress {
        project_policy(policy, Direction::Egress, &mut rows);
    }
    rows
}

fn project_policy(policy: &NetworkPolicy, direction: Direction, rows: &mut Vec<DisplayRow>) {
    let name = policy.name_any();
    let spec = policy.spec.as_ref();

    let rules: Option<Vec<(&[NetworkPolicyPort], &[NetworkPolicyPeer])>> = match direction {
        Direction::Ingress => spec.and_then(|s| s.ingress.as_ref()).map(|rules| {
            rules
                .iter()
                .map(|r| (or_empty(&r.ports), or_empty(&r.from)))
                .collect()
        }),
        Direction::Egress => spec.and_then(|s| s.egress.as_ref()).map(|rules| {
            rules
                .iter()
                .map(|r| (or_empty(&r.ports), or_empty(&r.to)))
                .collect()
        }),
    };

    let Some(rules) = rules else {
        debug!(policy = %name, %direction, "no rule list, denying all traffic");
        rows.push(DisplayRow::deny_all(direction, name));
        return;
    };

    debug!(policy = %name, %direction, rules = rules.len(), "projecting rules");
    for (ports, peers) in rules {
        rows.push(DisplayRow::new(
            direction,
            name.clone(),
            Action::Allow,
            format_ports(ports),
            format_peers(peers),
        ));
    }
}

fn or_empty<T>(list: &Option<Vec<T>>) -> &[T] {
    list.as_deref().unwrap_or_default()
}

/// Render a rule's ports as `PROTO(port)` or `PROTO(port-end)`, space separated.
///
/// No ports means all ports (`*`). A port spec without a port value covers
/// every port of its protocol and renders as `PROTO(*)`.
pub fn format_ports(ports: &[NetworkPolicyPort]) -> String {
    if ports.is_empty() {
        return WILDCARD.to_string();
    }

    ports
        .iter()
        .map(|port| {
            let protocol = port.protocol.as_deref().unwrap_or_default();
            let value = match &port.port {
                Some(IntOrString::Int(n)) => n.to_string(),
                Some(IntOrString::String(name)) => name.clone(),
                None => WILDCARD.to_string(),
            };
            match port.end_port {
                Some(end) => format!("{protocol}({value}-{end})"),
                None => format!("{protocol}({value})"),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a rule's peers, space separated.
///
/// Within each peer, pod selector terms come first, then namespace selector
/// terms, then the IP block. No peers means all peers (`*`), and so does a
/// peer entry that sets none of the three.
pub fn format_peers(peers: &[NetworkPolicyPeer]) -> String {
    if peers.is_empty() {
        return WILDCARD.to_string();
    }

    let mut out = Vec::new();
    for peer in peers {
        let before = out.len();
        if let Some(selector) = &peer.pod_selector {
            push_selector_terms("podLabel", selector, &mut out);
        }
        if let Some(selector) = &peer.namespace_selector {
            push_selector_terms("nsLabel", selector, &mut out);
        }
        if let Some(block) = &peer.ip_block {
            // The dash stays even when nothing is excepted
            let except = block.except.as_deref().unwrap_or_default().join(",");
            out.push(format!("cidr({} -{})", block.cidr, except));
        }
        if out.len() == before {
            out.push(WILDCARD.to_string());
        }
    }
    out.join(" ")
}

fn push_selector_terms(kind: &str, selector: &LabelSelector, out: &mut Vec<String>) {
    let labels = selector.match_labels.iter().flatten();
    let expressions = selector.match_expressions.iter().flatten();

    let before = out.len();
    // match_labels is a BTreeMap, so terms come out sorted by key
    out.extend(labels.map(|(k, v)| format!("{kind}({k}={v})")));
    out.extend(expressions.map(|e| {
        let values = e.values.as_deref().unwrap_or_default().join(",");
        match e.operator.as_str() {
            "In" => format!("{kind}({} in ({values}))", e.key),
            "NotIn" => format!("{kind}({} notin ({values}))", e.key),
            "Exists" => format!("{kind}({})", e.key),
            "DoesNotExist" => format!("{kind}(!{})", e.key),
            op => format!("{kind}({} {op} ({values}))", e.key),
        }
    }));

    if out.len() == before {
        out.push(format!("{kind}({WILDCARD})"));
    }
}
