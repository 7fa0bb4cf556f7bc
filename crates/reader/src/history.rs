use std::collections::VecDeque;

use platform_sync_primitives::{Block, SyncPosition};

/// Window of the most recently committed positions, oldest first.
///
/// Heights are strictly increasing. The reader walks back through this window
/// when the chain source reorganizes.
#[derive(Debug)]
pub(crate) struct SyncHistory {
    window: usize,
    positions: VecDeque<SyncPosition>,
}

impl SyncHistory {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            positions: VecDeque::new(),
        }
    }

    /// Builds a history from positions in ascending height order, keeping the
    /// newest `window` of them.
    pub(crate) fn from_positions(
        window: usize,
        positions: impl IntoIterator<Item = SyncPosition>,
    ) -> Self {
        let mut history = Self::new(window);
        for position in positions {
            history.push(position);
        }
        history
    }

    pub(crate) fn tip(&self) -> Option<&SyncPosition> {
        self.positions.back()
    }

    /// Oldest remembered position.
    pub(crate) fn oldest(&self) -> Option<&SyncPosition> {
        self.positions.front()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub(crate) fn push(&mut self, position: SyncPosition) {
        debug_assert!(
            self.tip().map_or(true, |tip| tip.height() < position.height()),
            "sync history heights must increase"
        );
        self.positions.push_back(position);
        while self.positions.len() > self.window {
            self.positions.pop_front();
        }
    }

    /// Returns true if `block` was already committed at its height.
    pub(crate) fn contains(&self, block: &Block) -> bool {
        self.positions
            .iter()
            .any(|p| p.height() == block.height() && p.hash() == block.hash())
    }

    /// Drops every position at or above `height`, returning them oldest first.
    pub(crate) fn rollback_from(&mut self, height: u64) -> Vec<SyncPosition> {
        let keep = self.positions.partition_point(|p| p.height() < height);
        self.positions.split_off(keep).into()
    }

    pub(crate) fn clear(&mut self) {
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use platform_sync_primitives::BlockHash;

    use super::*;

    fn pos(height: u64) -> SyncPosition {
        SyncPosition::new(height, BlockHash::new([height as u8; 32]))
    }

    #[test]
    fn test_push_trims_to_window() {
        let mut history = SyncHistory::from_positions(3, (1..=5).map(pos));
        assert_eq!(history.tip(), Some(&pos(5)));
        assert_eq!(history.oldest(), Some(&pos(3)));

        let removed = history.rollback_from(0);
        assert_eq!(removed, vec![pos(3), pos(4), pos(5)]);
        assert!(history.is_empty());
    }

    #[test]
    fn test_rollback_from_keeps_ancestors() {
        let mut history = SyncHistory::from_positions(10, (1..=6).map(pos));

        let removed = history.rollback_from(5);
        assert_eq!(removed, vec![pos(5), pos(6)]);
        assert_eq!(history.tip(), Some(&pos(4)));

        // nothing left above the tip
        assert!(history.rollback_from(5).is_empty());
        assert_eq!(history.tip(), Some(&pos(4)));
    }

    #[test]
    fn test_contains_requires_matching_hash() {
        let history = SyncHistory::from_positions(4, (1..=3).map(pos));

        let same = Block::new(2, BlockHash::new([2; 32]), None, vec![]);
        let other = Block::new(2, BlockHash::new([7; 32]), None, vec![]);
        assert!(history.contains(&same));
        assert!(!history.contains(&other));
    }

    #[test]
    fn test_zero_window_still_tracks_tip() {
        let mut history = SyncHistory::new(0);
        history.push(pos(1));
        history.push(pos(2));
        assert_eq!(history.tip(), Some(&pos(2)));
        assert_eq!(history.rollback_from(0).len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut history = SyncHistory::from_positions(4, (1..=3).map(pos));
        history.clear();
        assert!(history.tip().is_none());
    }
}
