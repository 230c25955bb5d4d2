//! Slime schools

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::entity::SlimeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchoolId(pub u32);

/// A group of slimes sharing hit-point penalties
///
/// Members are kept by slime id; a slime belongs to at most one school.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct School {
    members: BTreeSet<SlimeId>,
    terminated: bool,
}

impl School {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self) -> impl Iterator<Item = SlimeId> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, slime: SlimeId) -> bool {
        self.members.contains(&slime)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub(crate) fn insert(&mut self, slime: SlimeId) -> bool {
        self.members.insert(slime)
    }

    pub(crate) fn remove(&mut self, slime: SlimeId) -> bool {
        self.members.remove(&slime)
    }

    pub(crate) fn clear(&mut self) {
        self.members.clear();
    }

    pub(crate) fn terminate(&mut self) {
        self.terminated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let mut school = School::new();
        assert!(school.is_empty());
        assert!(school.insert(SlimeId(3)));
        assert!(!school.insert(SlimeId(3)));
        assert!(school.insert(SlimeId(1)));
        assert_eq!(school.members().collect::<Vec<_>>(), vec![SlimeId(1), SlimeId(3)]);
        assert!(school.remove(SlimeId(3)));
        assert!(!school.contains(SlimeId(3)));
        assert_eq!(school.len(), 1);
    }
}
