//! Activation windows and the save-time status stamp.
//!
//! # Design Decisions
//! - A window is `[starts_at, ends_at)`; an unset bound is open on that side
//! - `status` is recomputed when an entity is saved, never when it is read
//! - `Stamped<T>` can only be built by recomputing, so a store cannot
//!   persist an entity that skipped the hook

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time window during which a rule applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl ActivationWindow {
    /// Window open on both sides.
    pub const ALWAYS: Self = Self {
        starts_at: None,
        ends_at: None,
    };

    pub fn new(starts_at: Option<DateTime<Utc>>, ends_at: Option<DateTime<Utc>>) -> Self {
        Self { starts_at, ends_at }
    }

    /// Active iff `starts_at <= now < ends_at`. `starts_at == ends_at` is never active.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.map_or(true, |start| now >= start)
            && self.ends_at.map_or(true, |end| now < end)
    }
}

/// Entities carrying a cached activation status.
pub trait Activatable {
    fn window(&self) -> &ActivationWindow;
    fn status(&self) -> bool;
    fn set_status(&mut self, status: bool);
}

/// An entity whose status was recomputed right before persistence.
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    entity: T,
    stamped_at: DateTime<Utc>,
}

impl<T: Activatable> Stamped<T> {
    pub(crate) fn stamp(mut entity: T, now: DateTime<Utc>) -> Self {
        let status = entity.window().is_active(now);
        entity.set_status(status);
        Self {
            entity,
            stamped_at: now,
        }
    }
}

impl<T> Stamped<T> {
    pub fn get(&self) -> &T {
        &self.entity
    }

    pub fn stamped_at(&self) -> DateTime<Utc> {
        self.stamped_at
    }

    pub fn into_inner(self) -> T {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_open_window_always_active() {
        assert!(ActivationWindow::ALWAYS.is_active(at(0)));
        assert!(ActivationWindow::ALWAYS.is_active(at(i64::from(u32::MAX))));
    }

    #[test]
    fn test_bounds_are_half_open() {
        let window = ActivationWindow::new(Some(at(0)), Some(at(10)));
        assert!(!window.is_active(at(-1)));
        assert!(window.is_active(at(0)));
        assert!(window.is_active(at(9)));
        assert!(!window.is_active(at(10)));
    }

    #[test]
    fn test_empty_window_never_active() {
        let window = ActivationWindow::new(Some(at(5)), Some(at(5)));
        for t in [4, 5, 6] {
            assert!(!window.is_active(at(t)));
        }
    }

    #[test]
    fn test_widening_never_deactivates() {
        let narrow = ActivationWindow::new(Some(at(0)), Some(at(10)));
        let wider = [
            ActivationWindow::new(Some(at(-5)), Some(at(10))),
            ActivationWindow::new(Some(at(0)), Some(at(20))),
            ActivationWindow::new(None, Some(at(10))),
            ActivationWindow::new(Some(at(0)), None),
            ActivationWindow::ALWAYS,
        ];
        for offset in -10..30 {
            let now = at(0) + Duration::seconds(offset);
            if narrow.is_active(now) {
                for w in &wider {
                    assert!(w.is_active(now), "{w:?} inactive at {offset}");
                }
            }
        }
    }
}
