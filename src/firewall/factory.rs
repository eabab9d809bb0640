//! Entry factory: configuration list → immutable entry set.
//!
//! # Design Decisions
//! - Every malformed pattern is reported, with its index, at boot
//! - Ordering: descending priority, configuration order breaking ties

use crate::config::schema::FirewallConfig;
use crate::config::validation::ValidationError;
use crate::firewall::entry::{EntrySet, FirewallEntry};
use crate::firewall::pattern::Pattern;

pub struct EntryFactory;

impl EntryFactory {
    /// Build the entry set, failing with every pattern error found.
    pub fn build(config: &FirewallConfig) -> Result<EntrySet, Vec<ValidationError>> {
        let mut entries = Vec::with_capacity(config.entries.len());
        let mut errors = Vec::new();

        for (position, entry) in config.entries.iter().enumerate() {
            match entry.pattern.parse::<Pattern>() {
                Ok(pattern) => entries.push(FirewallEntry::new(
                    pattern,
                    entry.action,
                    entry.priority.unwrap_or(0),
                    position,
                )),
                Err(e) => errors.push(ValidationError::new(
                    format!("firewall.entries[{position}].pattern"),
                    e.to_string(),
                )),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // Stable sort keeps configuration order among equal priorities.
        entries.sort_by_key(|e| std::cmp::Reverse(e.priority()));

        Ok(EntrySet::new(entries, config.default_action))
    }
}
