use crate::error::{Result, WidgetError};
use crate::value::{ValueKind, WidgetState, WidgetValue};
use crate::widget_id::WidgetKey;
use std::collections::{BTreeMap, HashSet};

/// Values keyed by [`WidgetKey`], so the same element id under another form
/// is another entry.
///
/// Used both for the committed store and for a form's pending values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetStates {
    states: BTreeMap<WidgetKey, WidgetValue>,
}

impl WidgetStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &WidgetKey) -> Option<&WidgetValue> {
        self.states.get(key)
    }

    pub fn contains(&self, key: &WidgetKey) -> bool {
        self.states.contains_key(key)
    }

    /// Fails when `key` already holds a value of another kind.
    pub fn check_kind(&self, key: &WidgetKey, written: ValueKind) -> Result<()> {
        match self.states.get(key) {
            Some(existing) => check_kind(key, existing.kind(), written),
            None => Ok(()),
        }
    }

    /// Stores `value` under `key`. Replacing a value of another kind is a
    /// contract violation between the server-declared element type and the
    /// control handling it.
    pub fn set(&mut self, key: &WidgetKey, value: WidgetValue) -> Result<()> {
        self.check_kind(key, value.kind())?;
        self.states.insert(key.clone(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &WidgetKey) -> Option<WidgetValue> {
        self.states.remove(key)
    }

    /// Checks every entry of `other` against `self` without writing.
    pub fn check_merge(&self, other: &WidgetStates) -> Result<()> {
        other
            .states
            .iter()
            .try_for_each(|(key, value)| self.check_kind(key, value.kind()))
    }

    /// Merges `other` over `self`, entry by entry. Nothing is written when
    /// any entry would change kind.
    pub fn copy_from(&mut self, other: &WidgetStates) -> Result<()> {
        self.check_merge(other)?;
        for (key, value) in &other.states {
            self.states.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn retain_active(&mut self, active: &HashSet<WidgetKey>) {
        self.states.retain(|key, _| active.contains(key));
    }

    pub fn remove_triggers(&mut self) {
        self.states
            .retain(|_, value| value.kind() != ValueKind::Trigger);
    }

    /// Wire snapshot, ordered by element id then form id.
    pub fn snapshot(&self) -> Vec<WidgetState> {
        self.states
            .iter()
            .map(|(key, value)| WidgetState {
                id: key.element_id.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

fn check_kind(key: &WidgetKey, stored: ValueKind, written: ValueKind) -> Result<()> {
    if stored == written {
        Ok(())
    } else {
        Err(WidgetError::ValueKindMismatch {
            id: key.to_string(),
            stored,
            written,
        })
    }
}
