//! Per-turn accumulation of streamed tool-call fragments.
//!
//! Providers send a call's id and name once, then address the remaining
//! argument fragments by index only. The accumulator keeps an explicit
//! index → call table built on first sighting, scoped to one turn.

use std::collections::HashMap;

use crate::chunk::ToolCallFragment;
use crate::error::AccumulatorError;

/// A tool call assembled from fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatedToolCall {
    /// Provider-assigned id. Empty until a fragment carries one.
    pub id: String,
    /// Tool name. Empty until a fragment carries one.
    pub name: String,
    /// Concatenated argument text.
    pub arguments: String,
    /// Index the call was first seen at.
    pub index: usize,
}

impl AccumulatedToolCall {
    /// Whether both id and name are known.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }
}

/// Index/id resolution and argument buffers for one turn.
#[derive(Debug, Clone, Default)]
pub struct ToolCallAccumulator {
    calls: Vec<AccumulatedToolCall>,
    by_index: HashMap<usize, usize>,
    by_id: HashMap<String, usize>,
}

impl ToolCallAccumulator {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment into the accumulator.
    ///
    /// Returns the updated call. A fragment that reuses an index already
    /// bound to a different id is rejected and nothing changes.
    pub fn push(
        &mut self,
        index: usize,
        fragment: &ToolCallFragment,
    ) -> Result<&AccumulatedToolCall, AccumulatorError> {
        let slot = match fragment.id() {
            Some(id) => self.resolve_with_id(index, id)?,
            None => match self.by_index.get(&index) {
                Some(&slot) => slot,
                None => self.insert(index, String::new()),
            },
        };

        let call = &mut self.calls[slot];
        if call.name.is_empty() {
            if let Some(name) = fragment.name() {
                call.name = name.to_string();
            }
        }
        call.arguments.push_str(&fragment.arguments);
        Ok(&self.calls[slot])
    }

    fn resolve_with_id(&mut self, index: usize, id: &str) -> Result<usize, AccumulatorError> {
        if let Some(&slot) = self.by_id.get(id) {
            return match self.by_index.get(&index) {
                Some(&bound) if bound != slot => Err(AccumulatorError::IndexConflict {
                    index,
                    existing: self.calls[bound].id.clone(),
                    incoming: id.to_string(),
                }),
                Some(_) => Ok(slot),
                None => {
                    self.by_index.insert(index, slot);
                    Ok(slot)
                }
            };
        }

        match self.by_index.get(&index) {
            // Argument text arrived before the header.
            Some(&slot) if self.calls[slot].id.is_empty() => {
                self.calls[slot].id = id.to_string();
                self.by_id.insert(id.to_string(), slot);
                Ok(slot)
            }
            Some(&slot) => Err(AccumulatorError::IndexConflict {
                index,
                existing: self.calls[slot].id.clone(),
                incoming: id.to_string(),
            }),
            None => Ok(self.insert(index, id.to_string())),
        }
    }

    fn insert(&mut self, index: usize, id: String) -> usize {
        let slot = self.calls.len();
        if !id.is_empty() {
            self.by_id.insert(id.clone(), slot);
        }
        self.by_index.insert(index, slot);
        self.calls.push(AccumulatedToolCall {
            id,
            name: String::new(),
            arguments: String::new(),
            index,
        });
        slot
    }

    /// The call bound to `index`, if any.
    pub fn get_by_index(&self, index: usize) -> Option<&AccumulatedToolCall> {
        self.by_index.get(&index).map(|&slot| &self.calls[slot])
    }

    /// The call with `id`, if any.
    pub fn get(&self, id: &str) -> Option<&AccumulatedToolCall> {
        self.by_id.get(id).map(|&slot| &self.calls[slot])
    }

    /// Calls with both id and name, ordered by first index.
    pub fn complete_calls(&self) -> Vec<AccumulatedToolCall> {
        let mut calls: Vec<_> = self
            .calls
            .iter()
            .filter(|call| call.is_complete())
            .cloned()
            .collect();
        calls.sort_by_key(|call| call.index);
        calls
    }

    /// Every entry, including ones still missing an id or name, in arrival order.
    pub fn entries(&self) -> &[AccumulatedToolCall] {
        &self.calls
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.calls.clear();
        self.by_index.clear();
        self.by_id.clear();
    }
}
