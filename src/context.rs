// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Request context carried through every engine call.
//!
//! A [`Context`] bundles a cancellation token, an optional deadline, and
//! ambient request-scoped values: the session id, the subagent marker, and
//! thinking-mode hints. Cancellation is cooperative; subsystems check the
//! context on entry and between stages, and bound their own waits by the
//! remaining deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::ToolError;

/// Thinking-mode hint carried by a context.
///
/// Propagated verbatim to subagent boundaries; subsystems that ignore it
/// behave as if it were absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinkingMode {
    pub enabled: bool,
    pub budget_tokens: u32,
    pub show: bool,
}

#[derive(Debug, Default, Clone)]
struct ContextValues {
    session_id: Option<String>,
    is_subagent: bool,
    thinking: Option<ThinkingMode>,
}

/// Carries deadline, cancellation, and ambient values through every call.
///
/// Cloning is cheap; clones share the same cancellation token. Derived
/// contexts ([`Context::child`], [`Context::with_timeout`]) are cancelled
/// when their parent is cancelled, but not vice versa.
#[derive(Debug, Clone)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    values: Arc<ContextValues>,
}

impl Context {
    /// A root context with no deadline and no ambient values.
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            values: Arc::new(ContextValues::default()),
        }
    }

    /// Derive a child context: cancelled with the parent, same deadline
    /// and values, but independently cancellable.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            values: Arc::clone(&self.values),
        }
    }

    /// Derive a child context whose deadline is at most `timeout` from now.
    ///
    /// A tighter parent deadline is never extended.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child context with the given deadline, capped by the
    /// parent's own deadline when that is tighter.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let effective = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(effective),
            values: Arc::clone(&self.values),
        }
    }

    /// Cancel this context and all contexts derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check whether this context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancellation token backing this context.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time remaining until the deadline. `None` means unbounded;
    /// `Some(ZERO)` means the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Bound a tool-default timeout by the parent's remaining time.
    pub fn bounded_timeout(&self, default: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.min(default),
            None => default,
        }
    }

    /// Return an error promptly if the context is cancelled or past its
    /// deadline. Subsystems call this on entry and between stages.
    pub fn check(&self) -> Result<(), ToolError> {
        if self.cancel.is_cancelled() {
            return Err(ToolError::Cancelled("context cancelled".to_string()));
        }
        if let Some(remaining) = self.remaining() {
            if remaining.is_zero() {
                return Err(ToolError::Cancelled("context deadline exceeded".to_string()));
            }
        }
        Ok(())
    }

    /// Attach a session id.
    pub fn with_session_id(&self, session_id: impl Into<String>) -> Self {
        let mut values = (*self.values).clone();
        values.session_id = Some(session_id.into());
        Self {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            values: Arc::new(values),
        }
    }

    /// Mark this context as belonging to a subagent.
    pub fn with_subagent_marker(&self) -> Self {
        let mut values = (*self.values).clone();
        values.is_subagent = true;
        Self {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            values: Arc::new(values),
        }
    }

    /// Attach a thinking-mode hint.
    pub fn with_thinking_mode(&self, thinking: ThinkingMode) -> Self {
        let mut values = (*self.values).clone();
        values.thinking = Some(thinking);
        Self {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            values: Arc::new(values),
        }
    }

    /// The session id, if set.
    pub fn session_id(&self) -> Option<&str> {
        self.values.session_id.as_deref()
    }

    /// Whether this context carries the subagent marker. Unset means false.
    pub fn is_subagent(&self) -> bool {
        self.values.is_subagent
    }

    /// The thinking-mode hint, if set.
    pub fn thinking_mode(&self) -> Option<&ThinkingMode> {
        self.values.thinking.as_ref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
