/// Tracks which palette, if any, is currently chosen. Selection is allowed
/// whenever the index is valid against the current palette count; the
/// controller clears it at the start of every generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStore {
    selected: Option<usize>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Sets the selection if `index` is within `[0, len)`; out-of-range
    /// requests are silently ignored. Returns whether the selection changed.
    pub fn select(&mut self, index: usize, len: usize) -> bool {
        if index >= len {
            return false;
        }
        self.selected = Some(index);
        true
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionStore;

    #[test]
    fn select_within_bounds() {
        let mut s = SelectionStore::new();
        assert!(s.select(2, 3));
        assert_eq!(s.selected(), Some(2));
    }

    #[test]
    fn out_of_bounds_leaves_selection_unchanged() {
        let mut s = SelectionStore::new();
        assert!(s.select(1, 3));
        assert!(!s.select(3, 3));
        assert!(!s.select(0, 0));
        assert_eq!(s.selected(), Some(1));
    }

    #[test]
    fn clear_resets() {
        let mut s = SelectionStore::new();
        s.select(0, 1);
        s.clear();
        assert_eq!(s.selected(), None);
    }
}
