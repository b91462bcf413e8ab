//! Threshold-crossing state for discrete panel channels
//!
//! A toggle switch wired to a pot must register one logical flip per
//! physical flip, whatever the polling rate. Switch channels therefore latch
//! on the rising edge only; Button channels pass the level straight through.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Identifies one toggle history: a channel driving a particular button
///
/// Reassigning a channel to another button starts a fresh history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToggleKey {
    pub channel: usize,
    pub button: u16,
}

impl ToggleKey {
    pub fn new(channel: usize, button: u16) -> Self {
        Self { channel, button }
    }
}

/// How a threshold decision becomes a button state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleMode {
    /// Edge-triggered latch
    Switch,
    /// Level pass-through
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleState {
    /// Whether the previous sample was above threshold
    pub last_threshold_state: bool,
    /// Latched output of a Switch channel
    pub current_button_state: bool,
}

/// Persisted latch state of one toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleRecord {
    pub channel: usize,
    pub button: u16,
    pub pressed: bool,
}

/// Per-key toggle bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleStateMachine {
    states: BTreeMap<ToggleKey, ToggleState>,
}

impl ToggleStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a key has a state entry
    pub fn ensure(&mut self, key: ToggleKey) {
        self.states.entry(key).or_default();
    }

    /// Feed one threshold decision and return the button state to assert
    pub fn update(&mut self, key: ToggleKey, above_threshold: bool, mode: ToggleMode) -> bool {
        let state = self.states.entry(key).or_default();
        let output = match mode {
            ToggleMode::Button => above_threshold,
            ToggleMode::Switch => {
                if above_threshold && !state.last_threshold_state {
                    state.current_button_state = !state.current_button_state;
                    debug!(
                        "Channel {} toggled button {} {}",
                        key.channel + 1,
                        key.button,
                        if state.current_button_state { "on" } else { "off" }
                    );
                }
                state.current_button_state
            }
        };
        state.last_threshold_state = above_threshold;
        output
    }

    pub fn get(&self, key: ToggleKey) -> Option<&ToggleState> {
        self.states.get(&key)
    }

    /// Forget all history; every switch reads off again
    pub fn reset(&mut self) {
        debug!("Toggle states reset");
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Latched states, ordered by channel then button
    pub fn export(&self) -> Vec<ToggleRecord> {
        self.states
            .iter()
            .map(|(key, state)| ToggleRecord {
                channel: key.channel,
                button: key.button,
                pressed: state.current_button_state,
            })
            .collect()
    }

    /// Restore latched states
    ///
    /// The threshold history is not persisted, so the first sample after a
    /// restore that is above threshold counts as a rising edge.
    pub fn restore(&mut self, records: &[ToggleRecord]) {
        for record in records {
            let state = self
                .states
                .entry(ToggleKey::new(record.channel, record.button))
                .or_default();
            state.current_button_state = record.pressed;
            state.last_threshold_state = false;
        }
    }
}
