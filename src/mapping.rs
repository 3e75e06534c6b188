//! Button → key-chord mapping table
//!
//! Built once from configuration before the event loop starts, read-only after.

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use log::warn;

use crate::input::keycodes::{self, EV_KEY};

/// One source button and the keys it presses, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonAction {
    source_button: u16,
    key_sequence: Vec<u16>,
}

impl ButtonAction {
    /// The key sequence must be non-empty; duplicates are allowed
    pub fn new(source_button: u16, key_sequence: Vec<u16>) -> Result<Self> {
        if key_sequence.is_empty() {
            return Err(anyhow!(
                "mapping for {} has no keys",
                keycodes::describe(source_button)
            ));
        }
        Ok(Self {
            source_button,
            key_sequence,
        })
    }

    pub fn source_button(&self) -> u16 {
        self.source_button
    }

    pub fn key_sequence(&self) -> &[u16] {
        &self.key_sequence
    }
}

/// Ordered set of button actions, first match wins
#[derive(Debug, Clone)]
pub struct MappingTable {
    /// Event type the source buttons are reported as
    event_kind: u16,
    actions: Vec<ButtonAction>,
}

impl MappingTable {
    pub fn new(actions: Vec<ButtonAction>) -> Self {
        for (i, action) in actions.iter().enumerate() {
            if actions[..i]
                .iter()
                .any(|a| a.source_button == action.source_button)
            {
                warn!(
                    "Duplicate mapping for {} ignored (first entry wins)",
                    keycodes::describe(action.source_button)
                );
            }
        }
        Self {
            event_kind: EV_KEY,
            actions,
        }
    }

    pub fn event_kind(&self) -> u16 {
        self.event_kind
    }

    pub fn actions(&self) -> &[ButtonAction] {
        &self.actions
    }

    /// First action whose source button matches `code`
    pub fn lookup(&self, code: u16) -> Option<&ButtonAction> {
        self.actions.iter().find(|a| a.source_button == code)
    }

    /// Every key any action can emit (the virtual device's capability set)
    pub fn capabilities(&self) -> BTreeSet<u16> {
        self.actions
            .iter()
            .flat_map(|a| a.key_sequence.iter().copied())
            .collect()
    }
}
