//! Immutable firewall entries built from configuration.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::firewall::pattern::Pattern;

/// What happens to a client matching an entry or rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryAction {
    #[default]
    Allow,
    Deny,
}

/// A configuration-derived allow/deny matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallEntry {
    pattern: Pattern,
    action: EntryAction,
    priority: i32,
    /// Index in the configuration list.
    position: usize,
}

impl FirewallEntry {
    pub fn new(pattern: Pattern, action: EntryAction, priority: i32, position: usize) -> Self {
        Self {
            pattern,
            action,
            priority,
            position,
        }
    }

    /// Catch-all entry carrying the default action.
    pub fn fallback(action: EntryAction) -> Self {
        Self::new(Pattern::Any, action, i32::MIN, usize::MAX)
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn action(&self) -> EntryAction {
        self.action
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_fallback(&self) -> bool {
        self.position == usize::MAX
    }

    pub fn matches(&self, ip: Option<IpAddr>, host: Option<&str>) -> bool {
        self.pattern.matches(ip, host)
    }
}

/// Ordered entries plus the implicit fallback.
#[derive(Debug, Clone)]
pub struct EntrySet {
    entries: Vec<FirewallEntry>,
    fallback: FirewallEntry,
}

impl EntrySet {
    /// Entries must already be in evaluation order.
    pub(crate) fn new(entries: Vec<FirewallEntry>, default_action: EntryAction) -> Self {
        Self {
            entries,
            fallback: FirewallEntry::fallback(default_action),
        }
    }

    /// First configured entry matching the identity.
    pub fn first_match(&self, ip: Option<IpAddr>, host: Option<&str>) -> Option<&FirewallEntry> {
        self.entries.iter().find(|e| e.matches(ip, host))
    }

    pub fn fallback(&self) -> &FirewallEntry {
        &self.fallback
    }

    pub fn entries(&self) -> &[FirewallEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
