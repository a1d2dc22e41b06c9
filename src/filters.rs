//! Key selection predicates.
//!
//! The match-all / substring branching happens once at configuration time
//! by selecting a variant; the hot deletion path only calls `matches()`.

/// Pure predicate over object keys. No state, no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPredicate {
    /// Select every object.
    MatchAll,
    /// Select objects whose key contains the given substring
    /// (e.g. a ticker symbol embedded in the key).
    Contains(String),
}

impl KeyPredicate {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPredicate::MatchAll => true,
            KeyPredicate::Contains(needle) => key.contains(needle.as_str()),
        }
    }

    /// Human-readable description for run logging.
    pub fn describe(&self) -> String {
        match self {
            KeyPredicate::MatchAll => "ALL OBJECTS".to_string(),
            KeyPredicate::Contains(needle) => format!("keys containing '{needle}'"),
        }
    }
}
