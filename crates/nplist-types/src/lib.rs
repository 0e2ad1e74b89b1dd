//! Shared types for nplist
//!
//! This crate contains the display model produced by the policy projector and
//! consumed by the renderers.

use serde::Serialize;
use std::fmt;

// ============================================================================
// Policy Types
// ============================================================================

/// Traffic direction governed by a network policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    /// Name as it appears in a policy's `policyTypes`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingress => "Ingress",
            Self::Egress => "Egress",
        }
    }

    /// Header for the peer column of this direction's table section
    pub fn peer_header(&self) -> &'static str {
        match self {
            Self::Ingress => "Source",
            Self::Egress => "Destination",
        }
    }

    /// Parse a `policyTypes` entry (case-sensitive, as the API defines it)
    pub fn from_policy_type(s: &str) -> Option<Self> {
        match s {
            "Ingress" => Some(Self::Ingress),
            "Egress" => Some(Self::Egress),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a displayed rule does to matching traffic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// An explicit rule letting traffic through
    Allow,
    /// A policy type declared without any rule list
    Deny,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Display Types
// ============================================================================

/// Wildcard shown for "all ports" and "all peers"
pub const WILDCARD: &str = "*";

/// One flattened policy rule, ready for tabular display
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub direction: Direction,

    /// Name of the network policy the rule belongs to
    pub policy: String,

    pub action: Action,

    /// Formatted port list, `*` for all ports
    pub ports: String,

    /// Formatted peer list, `*` for all peers
    pub peers: String,
}

impl DisplayRow {
    pub fn new(
        direction: Direction,
        policy: String,
        action: Action,
        ports: String,
        peers: String,
    ) -> Self {
        Self {
            direction,
            policy,
            action,
            ports,
            peers,
        }
    }

    /// The row emitted for a policy that declares a direction but has no rules
    pub fn deny_all(direction: Direction, policy: String) -> Self {
        Self::new(
            direction,
            policy,
            Action::Deny,
            WILDCARD.to_string(),
            WILDCARD.to_string(),
        )
    }

    /// Cells in column order: direction, policy, action, ports, peers
    pub fn cells(&self) -> [&str; 5] {
        [
            self.direction.as_str(),
            &self.policy,
            self.action.as_str(),
            &self.ports,
            &self.peers,
        ]
    }
}
