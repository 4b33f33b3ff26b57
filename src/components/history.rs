use std::collections::VecDeque;

// ============================================================================
// SNAPSHOT HISTORY: bounded undo/redo over full copies of a value
// ============================================================================

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_SIZE: usize = 50;

/// One captured state plus the label shown in history lists.
#[derive(Clone, Debug)]
struct Snapshot<T> {
    description: String,
    state: T,
}

/// Undo/redo history over snapshots of `T`.
///
/// Callers push the state *before* a mutation, then commit the mutated value
/// themselves. `undo`/`redo` hand back the state to restore and keep a copy of
/// the state being replaced on the opposite stack. Snapshots are owned clones,
/// so nothing the caller does afterwards can reach into the history.
#[derive(Clone, Debug)]
pub struct HistoryManager<T: Clone> {
    undo_stack: VecDeque<Snapshot<T>>,
    redo_stack: VecDeque<Snapshot<T>>,
    max_history_size: usize,
}

impl<T: Clone> Default for HistoryManager<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl<T: Clone> HistoryManager<T> {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
        }
    }

    /// Capture `current` (the pre-mutation state). Clears redo history.
    pub fn push_state(&mut self, current: &T) {
        self.push_labeled(current, "Edit");
    }

    pub fn push_labeled(&mut self, current: &T, description: impl Into<String>) {
        // A new forward edit invalidates anything that could be redone
        self.redo_stack.clear();

        self.undo_stack.push_back(Snapshot {
            description: description.into(),
            state: current.clone(),
        });
        self.prune();
    }

    /// Step back. Returns the state to restore, or `None` if there is nothing
    /// to undo.
    pub fn undo(&mut self, current: &T) -> Option<T> {
        let snapshot = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(Snapshot {
            description: snapshot.description.clone(),
            state: current.clone(),
        });
        Some(snapshot.state)
    }

    /// Step forward. Returns the state to restore, or `None` if there is
    /// nothing to redo.
    pub fn redo(&mut self, current: &T) -> Option<T> {
        let snapshot = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(Snapshot {
            description: snapshot.description.clone(),
            state: current.clone(),
        });
        Some(snapshot.state)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|s| s.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|s| s.description.as_str())
    }

    /// All undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|s| s.description.clone()).collect()
    }

    /// Undo `steps` times in a row, returning the last restored state.
    pub fn undo_to(&mut self, steps: usize, current: &T) -> Option<T> {
        let mut restored: Option<T> = None;
        for _ in 0..steps {
            let from = restored.as_ref().unwrap_or(current).clone();
            match self.undo(&from) {
                Some(state) => restored = Some(state),
                None => break,
            }
        }
        restored
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Change the capacity; excess oldest entries are dropped immediately.
    pub fn set_max_history_size(&mut self, size: usize) {
        self.max_history_size = size.max(1);
        self.prune();
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}
