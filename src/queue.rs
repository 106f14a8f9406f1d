use crate::edit::Edit;

/// Whether a queue holds pending edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Clean,
    Dirty,
}

/// Ordered list of edits waiting to be applied
#[derive(Debug, Clone, Default)]
pub struct EditQueue {
    edits: Vec<Edit>,
}

impl EditQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: Edit) {
        tracing::debug!(kind = edit.kind.name(), path = %edit.path, "queued edit");
        self.edits.push(edit);
    }

    /// Remove and return the edit at `index`, keeping the order of the rest
    pub fn remove(&mut self, index: usize) -> Option<Edit> {
        (index < self.edits.len()).then(|| self.edits.remove(index))
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn state(&self) -> QueueState {
        if self.edits.is_empty() {
            QueueState::Clean
        } else {
            QueueState::Dirty
        }
    }

    pub fn as_slice(&self) -> &[Edit] {
        &self.edits
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Edit> {
        self.edits.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
