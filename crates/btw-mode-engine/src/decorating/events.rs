use std::collections::BTreeMap;

use crate::tree::NodeId;

/// Refresh channels keyed by the node whose rendering others depend on.
///
/// A pointer describing an example subscribes to the example's `ref`; when
/// the citation text of that `ref` changes, publishing on it yields the
/// pointers to re-render.
#[derive(Debug, Default)]
pub struct EventBus {
    subscriptions: BTreeMap<NodeId, Vec<NodeId>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, source: NodeId, dependent: NodeId) {
        let dependents = self.subscriptions.entry(source).or_default();
        if !dependents.contains(&dependent) {
            dependents.push(dependent);
        }
    }

    /// Drop every subscription held by `dependent`
    pub fn unsubscribe_dependent(&mut self, dependent: NodeId) {
        for dependents in self.subscriptions.values_mut() {
            dependents.retain(|&d| d != dependent);
        }
        self.subscriptions.retain(|_, dependents| !dependents.is_empty());
    }

    /// Drop every subscription involving `node`, as source or dependent
    pub fn forget(&mut self, node: NodeId) {
        self.subscriptions.remove(&node);
        self.unsubscribe_dependent(node);
    }

    /// Dependents to refresh after `source` changed
    pub fn publish(&self, source: NodeId) -> Vec<NodeId> {
        self.subscriptions.get(&source).cloned().unwrap_or_default()
    }

    pub fn dependents_of(&self, source: NodeId) -> &[NodeId] {
        self.subscriptions
            .get(&source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
