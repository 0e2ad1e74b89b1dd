//! Network policy resolution for nplist
//!
//! This crate decides which network policies select a pod and flattens their
//! rules into display rows.

mod error;
mod projector;
mod selector;

pub use error::Error;
pub use projector::{format_peers, format_ports, project};
pub use selector::{SelectedPolicies, matches, select_policies};

// Re-export types used in our public API
pub use nplist_types::{Action, Direction, DisplayRow};
