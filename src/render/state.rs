//! Per-element state kept across refreshes.
//!
//! Two independent pieces of state are tracked per [`ElementKey`]: the
//! interaction [`Visibility`] and the [`Lifecycle`] phase. Both are keyed by
//! stable identity, never by position in a graph, so they survive any number
//! of refreshes.

use super::visibility::Visibility;
use crate::core::{EdgeKey, ElementKey, NodeId};
use std::collections::{HashMap, HashSet};

/// Visibility of every element that is not in the default state.
///
/// At most one node is focused at a time. States written through
/// [`VisualStateStore::derive`] are remembered as consequences of the focus,
/// so [`VisualStateStore::clear_focus`] can drop them while keeping the ones
/// set explicitly.
#[derive(Debug, Clone, Default)]
pub struct VisualStateStore {
    states: HashMap<ElementKey, Visibility>,
    focused: Option<NodeId>,
    derived: HashSet<ElementKey>,
}

impl VisualStateStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Visibility of `key`, default when never set
    pub fn get(&self, key: &ElementKey) -> Visibility {
        self.states.get(key).copied().unwrap_or_default()
    }

    /// Visibility of a node
    pub fn node(&self, id: &NodeId) -> Visibility {
        self.get(&ElementKey::Node(id.clone()))
    }

    /// Visibility of an edge
    pub fn edge(&self, key: &EdgeKey) -> Visibility {
        self.get(&ElementKey::Edge(key.clone()))
    }

    /// Set the visibility of `key` explicitly.
    ///
    /// Focusing a node moves the focus: the previously focused node returns
    /// to the default visibility.
    pub fn set(&mut self, key: ElementKey, visibility: Visibility) {
        self.derived.remove(&key);
        self.write(key, visibility);
    }

    /// Set a visibility that follows from the current focus
    pub fn derive(&mut self, key: ElementKey, visibility: Visibility) {
        if visibility == Visibility::Default {
            self.derived.remove(&key);
        } else {
            self.derived.insert(key.clone());
        }
        self.write(key, visibility);
    }

    fn write(&mut self, key: ElementKey, visibility: Visibility) {
        if let ElementKey::Node(id) = &key {
            if visibility == Visibility::Focused {
                if let Some(previous) = self.focused.replace(id.clone()) {
                    if &previous != id {
                        self.states.remove(&ElementKey::Node(previous));
                    }
                }
            } else if self.focused.as_ref() == Some(id) {
                self.focused = None;
            }
        }

        if visibility == Visibility::Default {
            self.states.remove(&key);
        } else {
            self.states.insert(key, visibility);
        }
    }

    /// Whether the state of `key` follows from the focus
    pub fn is_derived(&self, key: &ElementKey) -> bool {
        self.derived.contains(key)
    }

    /// Drop the focus and every state derived from it
    pub fn clear_focus(&mut self) {
        if let Some(id) = self.focused.take() {
            self.states.remove(&ElementKey::Node(id));
        }
        for key in self.derived.drain() {
            self.states.remove(&key);
        }
    }

    /// Reset every element to the default visibility
    pub fn clear(&mut self) {
        self.states.clear();
        self.derived.clear();
        self.focused = None;
    }

    /// The focused node, if any
    pub fn focused_node(&self) -> Option<&NodeId> {
        self.focused.as_ref()
    }

    /// Number of elements in a non-default state
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether every element is in the default state
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Phase of an element between its first appearance and its removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// Not in the scene
    #[default]
    Absent,
    /// Drawn but not yet positioned
    Entering,
    /// Drawn and positioned
    Present,
    /// Marked for removal, still in the scene
    Exiting,
}

/// What [`LifecycleTracker::enter`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The element is new and must be drawn
    Created,
    /// The element was exiting and is present again, so it is updated in
    /// place instead of being redrawn
    Revived,
    /// The element was already in the scene
    AlreadyPresent,
}

/// Lifecycle state machine for every element in the scene
#[derive(Debug, Clone, Default)]
pub struct LifecycleTracker {
    states: HashMap<ElementKey, Lifecycle>,
}

impl LifecycleTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase of `key`
    pub fn state(&self, key: &ElementKey) -> Lifecycle {
        self.states.get(key).copied().unwrap_or_default()
    }

    /// Record that `key` is part of the new graph
    pub fn enter(&mut self, key: ElementKey) -> EnterOutcome {
        match self.state(&key) {
            Lifecycle::Absent => {
                self.states.insert(key, Lifecycle::Entering);
                EnterOutcome::Created
            },
            Lifecycle::Exiting => {
                self.states.insert(key, Lifecycle::Present);
                EnterOutcome::Revived
            },
            Lifecycle::Entering | Lifecycle::Present => EnterOutcome::AlreadyPresent,
        }
    }

    /// Entering elements become present once positioned
    pub fn settle(&mut self, key: &ElementKey) {
        if let Some(state) = self.states.get_mut(key) {
            if *state == Lifecycle::Entering {
                *state = Lifecycle::Present;
            }
        }
    }

    /// Mark `key` for removal. Returns false when it was not in the scene.
    pub fn exit(&mut self, key: &ElementKey) -> bool {
        match self.states.get_mut(key) {
            Some(state) if matches!(*state, Lifecycle::Entering | Lifecycle::Present) => {
                *state = Lifecycle::Exiting;
                true
            },
            _ => false,
        }
    }

    /// Finish every pending exit and return the removed keys
    pub fn complete_exits(&mut self) -> Vec<ElementKey> {
        let exited: Vec<ElementKey> = self
            .states
            .iter()
            .filter(|(_, state)| **state == Lifecycle::Exiting)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &exited {
            self.states.remove(key);
        }
        exited
    }

    /// Keys currently in `phase`
    pub fn in_phase(&self, phase: Lifecycle) -> impl Iterator<Item = &ElementKey> {
        self.states
            .iter()
            .filter(move |(_, state)| **state == phase)
            .map(|(key, _)| key)
    }
}
