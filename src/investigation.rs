// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Investigation lifecycle state machine.
//!
//! Each investigation is `running` until it transitions to exactly one of
//! the terminal states `completed` or `escalated`. The terminal check and
//! the state update share one critical section per id, so a race between
//! two concurrent completers yields exactly one success.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::ToolError;

/// Status of an investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestigationStatus {
    Running,
    Completed,
    Escalated,
}

impl InvestigationStatus {
    /// Check if this status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Process-local store of investigation states.
///
/// State is lost on restart; persistence is out of scope.
#[derive(Debug, Default)]
pub struct InvestigationStore {
    states: Mutex<HashMap<String, InvestigationStatus>>,
}

impl InvestigationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an investigation under a caller-supplied id.
    pub fn register(&self, id: &str) -> Result<(), ToolError> {
        let id = validated_id(id)?;
        let mut states = self.states.lock().expect("investigation lock poisoned");
        states.insert(id, InvestigationStatus::Running);
        Ok(())
    }

    /// Register a new investigation under a freshly minted id.
    pub fn register_new(&self) -> String {
        let id = format!("inv-{}", Uuid::new_v4());
        let mut states = self.states.lock().expect("investigation lock poisoned");
        states.insert(id.clone(), InvestigationStatus::Running);
        id
    }

    /// The current status of an investigation, if known.
    pub fn status(&self, id: &str) -> Option<InvestigationStatus> {
        let states = self.states.lock().expect("investigation lock poisoned");
        states.get(id.trim()).copied()
    }

    /// Transition `running -> completed`. At most one terminal transition
    /// succeeds per id.
    pub fn complete(&self, id: &str) -> Result<(), ToolError> {
        self.transition(id, InvestigationStatus::Completed)
    }

    /// Transition `running -> escalated`. At most one terminal transition
    /// succeeds per id.
    pub fn escalate(&self, id: &str) -> Result<(), ToolError> {
        self.transition(id, InvestigationStatus::Escalated)
    }

    /// Verify an investigation is still running (for progress reports).
    pub fn ensure_running(&self, id: &str) -> Result<(), ToolError> {
        let id = validated_id(id)?;
        let states = self.states.lock().expect("investigation lock poisoned");
        match states.get(&id) {
            None => Err(not_found(&id)),
            Some(InvestigationStatus::Running) => Ok(()),
            Some(terminal) => Err(already(&id, *terminal)),
        }
    }

    fn transition(&self, id: &str, target: InvestigationStatus) -> Result<(), ToolError> {
        let id = validated_id(id)?;
        let mut states = self.states.lock().expect("investigation lock poisoned");
        match states.get(&id) {
            None => Err(not_found(&id)),
            Some(InvestigationStatus::Running) => {
                states.insert(id, target);
                Ok(())
            }
            Some(terminal) => Err(already(&id, *terminal)),
        }
    }
}

fn validated_id(id: &str) -> Result<String, ToolError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidInput(
            "investigation_id must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn not_found(id: &str) -> ToolError {
    ToolError::NotFound(format!("investigation not found: {id}"))
}

fn already(id: &str, status: InvestigationStatus) -> ToolError {
    let state = match status {
        InvestigationStatus::Completed => "completed",
        InvestigationStatus::Escalated => "escalated",
        InvestigationStatus::Running => unreachable!("running is not terminal"),
    };
    ToolError::Terminal(format!("investigation {id} already {state}"))
}
