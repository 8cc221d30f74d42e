//! Identifiers shared between the core and host adapters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of a logical playback controller.
///
/// Hosts either use a numeric id (typically the id of the first view that
/// created the controller) or an application-chosen string. The key stays
/// stable across view rebuilds, which is what lets several views share one
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControllerId {
    Numeric(i64),
    Named(String),
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerId::Numeric(id) => write!(f, "{}", id),
            ControllerId::Named(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ControllerId {
    fn from(id: i64) -> Self {
        ControllerId::Numeric(id)
    }
}

impl From<&str> for ControllerId {
    fn from(name: &str) -> Self {
        ControllerId::Named(name.to_string())
    }
}

impl From<String> for ControllerId {
    fn from(name: String) -> Self {
        ControllerId::Named(name)
    }
}

/// Explicit handle of a presenter (UI rendering surface).
///
/// Presenters are compared by this id only, never by object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresenterId(pub u64);

impl fmt::Display for PresenterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "presenter-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_id_accepts_numbers_and_strings() {
        let numeric: ControllerId = serde_json::from_str("42").unwrap();
        assert_eq!(numeric, ControllerId::Numeric(42));

        let named: ControllerId = serde_json::from_str("\"hero-banner\"").unwrap();
        assert_eq!(named, ControllerId::from("hero-banner"));
        assert_eq!(named.to_string(), "hero-banner");
    }
}
