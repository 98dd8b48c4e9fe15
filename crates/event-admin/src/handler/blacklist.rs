//! Permanent blacklist of handlers that exceeded their delivery deadline.
//!
//! Entries keep a weak reference to their registration. An entry goes away
//! only once that registration is deactivated or dropped, never because a
//! registry snapshot happened not to list it.

use crate::domain::{HandlerId, HandlerRegistration};
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Blacklist {
    entries: DashMap<HandlerId, Weak<HandlerRegistration>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blacklisted(&self, id: &HandlerId) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns `true` if the registration was not blacklisted before.
    pub fn add(&self, registration: &Arc<HandlerRegistration>) -> bool {
        self.entries
            .insert(registration.id(), Arc::downgrade(registration))
            .is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<HandlerId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Drops entries whose registration was unregistered.
    ///
    /// Ids are never reused, so a dropped entry can never match a live
    /// registration again.
    pub fn prune_retired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, registration| registration.upgrade().is_some_and(|r| r.is_active()));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Pruned blacklist");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::handler_fn;
    use std::thread;

    fn registration(name: &str) -> Arc<HandlerRegistration> {
        Arc::new(
            HandlerRegistration::builder(name, handler_fn(|_| Ok(())))
                .topic("x")
                .build(),
        )
    }

    #[test]
    fn test_add_is_idempotent() {
        let blacklist = Blacklist::new();
        let reg = registration("a");
        assert!(blacklist.add(&reg));
        assert!(!blacklist.add(&reg));
        assert!(blacklist.is_blacklisted(&reg.id()));
        assert_eq!(blacklist.len(), 1);
    }

    #[test]
    fn test_prune_drops_only_retired_registrations() {
        let blacklist = Blacklist::new();
        let live = registration("live");
        let deactivated = registration("deactivated");
        let dropped = registration("dropped");
        blacklist.add(&live);
        blacklist.add(&deactivated);
        blacklist.add(&dropped);

        deactivated.deactivate();
        drop(dropped);

        assert_eq!(blacklist.prune_retired(), 2);
        assert_eq!(blacklist.snapshot(), vec![live.id()]);
        assert_eq!(blacklist.prune_retired(), 0);
    }

    #[test]
    fn test_concurrent_adds() {
        let blacklist = Arc::new(Blacklist::new());
        let reg = registration("racy");
        let newly_added: usize = (0..8)
            .map(|_| {
                let blacklist = Arc::clone(&blacklist);
                let reg = Arc::clone(&reg);
                thread::spawn(move || blacklist.add(&reg))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(newly_added, 1);
    }
}
