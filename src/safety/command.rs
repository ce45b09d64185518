// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shell command policy.
//!
//! Commands pass through two layers before execution:
//!
//! 1. A fixed classifier of dangerous patterns (destructive `rm`, `sudo`,
//!    `chmod 777`, filesystem formatting, raw disk writes). The model may
//!    additionally flag any command as dangerous; the classifier takes the
//!    union.
//! 2. An optional whitelist. A command is allowed iff every segment of its
//!    pipeline, plus every command substitution recursively, matches a
//!    configured pattern. Whitelisted commands skip the classifier.
//!
//! Shell parsing here is intentionally conservative: split on pipeline
//! separators and recurse into `$(...)` and backticks. Full shell parsing
//! would be an unsafe target for policy decisions.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ToolError;

/// A dangerous-command classifier row.
struct DangerousPattern {
    pattern: Regex,
    reason: &'static str,
}

static DANGEROUS_PATTERNS: Lazy<Vec<DangerousPattern>> = Lazy::new(|| {
    vec![
        DangerousPattern {
            pattern: Regex::new(r"rm\s+(-\w+\s+)*[/~*]").unwrap(),
            reason: "destructive rm command",
        },
        DangerousPattern {
            pattern: Regex::new(r"sudo\s+").unwrap(),
            reason: "sudo command",
        },
        DangerousPattern {
            pattern: Regex::new(r"chmod\s+777").unwrap(),
            reason: "insecure chmod",
        },
        DangerousPattern {
            pattern: Regex::new(r"mkfs\.").unwrap(),
            reason: "filesystem format",
        },
        DangerousPattern {
            pattern: Regex::new(r"dd\s+if=").unwrap(),
            reason: "low-level disk operation",
        },
    ]
});

// Redirection into /dev/* is dangerous except /dev/null
static DEV_WRITE: Lazy<Regex> = Lazy::new(|| Regex::new(r">\s*/dev/(\S*)").unwrap());

/// The user-visible classifier table: (pattern, reason) rows.
pub fn pattern_table() -> &'static [(&'static str, &'static str)] {
    &[
        (r"rm\s+(-\w+\s+)*[/~*]", "destructive rm command"),
        (r"sudo\s+", "sudo command"),
        (r"chmod\s+777", "insecure chmod"),
        (r"mkfs\.", "filesystem format"),
        (r"dd\s+if=", "low-level disk operation"),
        (r">\s*/dev/", "write to device"),
    ]
}

/// Classify a command against the fixed dangerous patterns.
///
/// Returns the human-readable reason of the first matching row.
pub fn classify_dangerous(command: &str) -> Option<&'static str> {
    for entry in DANGEROUS_PATTERNS.iter() {
        if entry.pattern.is_match(command) {
            return Some(entry.reason);
        }
    }
    for caps in DEV_WRITE.captures_iter(command) {
        if &caps[1] != "null" {
            return Some("write to device");
        }
    }
    None
}

/// Policy mode: blacklist (dangerous patterns only) or whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    Blacklist,
    Whitelist,
}

/// A whitelist entry: a pattern every allowed segment must match, plus a
/// description shown in confirmation prompts.
#[derive(Debug, Clone)]
pub struct WhitelistPattern {
    pub pattern: Regex,
    pub description: String,
}

impl WhitelistPattern {
    /// Compile a whitelist pattern.
    pub fn new(pattern: &str, description: impl Into<String>) -> Result<Self, ToolError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ToolError::InvalidInput(format!("invalid whitelist pattern: {e}")))?;
        Ok(Self {
            pattern,
            description: description.into(),
        })
    }
}

/// Confirmation callback: `(command, is_dangerous, reason, description)`.
///
/// Returns true to allow execution.
pub type ConfirmFn = dyn Fn(&str, bool, &str, &str) -> bool + Send + Sync;

/// The shell command policy applied by the bash tool.
///
/// Set once at engine construction; replaceable atomically. Readers take a
/// stable snapshot per invocation.
#[derive(Clone)]
pub struct ShellPolicy {
    mode: PolicyMode,
    whitelist: Vec<WhitelistPattern>,
    ask_on_unknown: bool,
    confirm: Option<Arc<ConfirmFn>>,
}

impl fmt::Debug for ShellPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellPolicy")
            .field("mode", &self.mode)
            .field("whitelist", &self.whitelist.len())
            .field("ask_on_unknown", &self.ask_on_unknown)
            .field("confirm", &self.confirm.is_some())
            .finish()
    }
}

impl ShellPolicy {
    /// Blacklist mode: only the dangerous-pattern classifier applies.
    pub fn blacklist() -> Self {
        Self {
            mode: PolicyMode::Blacklist,
            whitelist: Vec::new(),
            ask_on_unknown: false,
            confirm: None,
        }
    }

    /// Whitelist mode with the given allowed patterns.
    pub fn whitelist(patterns: Vec<WhitelistPattern>) -> Self {
        Self {
            mode: PolicyMode::Whitelist,
            whitelist: patterns,
            ask_on_unknown: false,
            confirm: None,
        }
    }

    /// In whitelist mode, delegate unknown commands to the confirmation
    /// callback instead of blocking them.
    pub fn with_ask_on_unknown(mut self, ask: bool) -> Self {
        self.ask_on_unknown = ask;
        self
    }

    /// Set the confirmation callback.
    pub fn with_confirm(
        mut self,
        confirm: impl Fn(&str, bool, &str, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.confirm = Some(Arc::new(confirm));
        self
    }

    /// The active policy mode.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Authorize a command for execution.
    ///
    /// `flagged_dangerous` is the model's own danger marking; the
    /// classifier takes the union. Whitelist mode takes precedence over
    /// the blacklist: a fully whitelisted command is not re-checked for
    /// dangerous patterns.
    pub fn authorize(
        &self,
        command: &str,
        description: &str,
        flagged_dangerous: bool,
    ) -> Result<(), ToolError> {
        match self.mode {
            PolicyMode::Whitelist => self.authorize_whitelist(command, description),
            PolicyMode::Blacklist => self.authorize_blacklist(command, description, flagged_dangerous),
        }
    }

    fn authorize_whitelist(&self, command: &str, description: &str) -> Result<(), ToolError> {
        let segments = decompose_command(command);
        let unmatched: Vec<&String> = segments
            .iter()
            .filter(|segment| !self.whitelist.iter().any(|w| w.pattern.is_match(segment)))
            .collect();

        if unmatched.is_empty() {
            return Ok(());
        }

        let reason = format!("command not in whitelist: '{}'", unmatched[0]);
        if self.ask_on_unknown {
            if let Some(confirm) = &self.confirm {
                if confirm(command, false, &reason, description) {
                    return Ok(());
                }
                return Err(ToolError::PolicyBlocked(format!(
                    "command denied by user: {command}"
                )));
            }
        }
        Err(ToolError::PolicyBlocked(reason))
    }

    fn authorize_blacklist(
        &self,
        command: &str,
        description: &str,
        flagged_dangerous: bool,
    ) -> Result<(), ToolError> {
        let classified = classify_dangerous(command);
        let dangerous = classified.is_some() || flagged_dangerous;
        let reason = classified.unwrap_or(if flagged_dangerous {
            "flagged as dangerous by the model"
        } else {
            ""
        });

        if let Some(confirm) = &self.confirm {
            if confirm(command, dangerous, reason, description) {
                return Ok(());
            }
            return Err(ToolError::PolicyBlocked(format!(
                "command denied by user: {command}"
            )));
        }

        if dangerous {
            return Err(ToolError::PolicyBlocked(format!(
                "dangerous command blocked ({reason}): {command}"
            )));
        }
        Ok(())
    }
}

impl Default for ShellPolicy {
    fn default() -> Self {
        Self::blacklist()
    }
}

/// Decompose a command into its pipeline segments plus every command
/// substitution, recursively.
///
/// Separators are `|`, `||`, `&&`, `&`, `;`, and newlines outside quotes.
/// `$(...)` and backtick bodies are appended as further segments.
pub fn decompose_command(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    for segment in split_pipeline(command) {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }
        segments.push(trimmed.to_string());
        for substitution in extract_substitutions(trimmed) {
            segments.extend(decompose_command(&substitution));
        }
    }
    segments
}

fn split_pipeline(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_backtick = false;
    let mut depth = 0usize;

    let mut chars = command.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double && !in_backtick => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single && !in_backtick => {
                in_double = !in_double;
                current.push(c);
            }
            '`' if !in_single => {
                in_backtick = !in_backtick;
                current.push(c);
            }
            '$' if !in_single && chars.peek() == Some(&'(') => {
                depth += 1;
                current.push(c);
                current.push(chars.next().unwrap());
            }
            '(' if depth > 0 && !in_single => {
                depth += 1;
                current.push(c);
            }
            ')' if depth > 0 && !in_single => {
                depth -= 1;
                current.push(c);
            }
            '|' | '&' | ';' | '\n'
                if !in_single && !in_double && !in_backtick && depth == 0 =>
            {
                // Consume the doubled form of || and &&
                if (c == '|' || c == '&') && chars.peek() == Some(&c) {
                    chars.next();
                }
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn extract_substitutions(segment: &str) -> Vec<String> {
    let mut found = Vec::new();
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() && chars[i + 1] == '(' {
            let mut depth = 1usize;
            let mut j = i + 2;
            let mut inner = String::new();
            while j < chars.len() && depth > 0 {
                match chars[j] {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                inner.push(chars[j]);
                j += 1;
            }
            found.push(inner);
            i = j + 1;
        } else if chars[i] == '`' {
            let mut j = i + 1;
            let mut inner = String::new();
            while j < chars.len() && chars[j] != '`' {
                inner.push(chars[j]);
                j += 1;
            }
            found.push(inner);
            i = j + 1;
        } else {
            i += 1;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    #[test]
    fn test_classifier_matches_every_row() {
        let samples = [
            ("rm -rf /", "destructive rm command"),
            ("rm -rf ~", "destructive rm command"),
            ("rm -f *", "destructive rm command"),
            ("sudo apt-get install foo", "sudo command"),
            ("chmod 777 /tmp/x", "insecure chmod"),
            ("mkfs.ext4 /dev/sda1", "filesystem format"),
            ("dd if=/dev/zero of=/dev/sda", "low-level disk operation"),
            ("echo x > /dev/sda", "write to device"),
        ];
        for (command, reason) in samples {
            assert_eq!(classify_dangerous(command), Some(reason), "{command}");
        }
    }

    #[test]
    fn test_classifier_allows_benign() {
        assert_eq!(classify_dangerous("echo hello"), None);
        assert_eq!(classify_dangerous("rm build/output.txt"), None);
        assert_eq!(classify_dangerous("cargo test 2> /dev/null"), None);
        assert_eq!(classify_dangerous("ls -la | grep foo"), None);
    }

    #[test]
    fn test_blacklist_blocks_without_callback() {
        let policy = ShellPolicy::blacklist();
        let err = policy.authorize("rm -rf /", "", false).unwrap_err();
        assert!(err.to_string().contains("dangerous"));
    }

    #[test]
    fn test_blacklist_model_flag_union() {
        let policy = ShellPolicy::blacklist();
        let err = policy.authorize("curl http://x", "", true).unwrap_err();
        assert!(matches!(err, ToolError::PolicyBlocked(_)));
    }

    #[test]
    fn test_callback_decides() {
        let allow = ShellPolicy::blacklist().with_confirm(|_, _, _, _| true);
        assert!(allow.authorize("rm -rf /", "", false).is_ok());

        let deny = ShellPolicy::blacklist().with_confirm(|_, _, _, _| false);
        let err = deny.authorize("rm -rf /", "", false).unwrap_err();
        assert!(err.to_string().contains("denied by user"));
    }

    #[test]
    fn test_callback_receives_reason() {
        let policy = ShellPolicy::blacklist().with_confirm(|command, dangerous, reason, desc| {
            assert_eq!(command, "sudo ls");
            assert!(dangerous);
            assert_eq!(reason, "sudo command");
            assert_eq!(desc, "list files");
            true
        });
        assert!(policy.authorize("sudo ls", "list files", false).is_ok());
    }

    #[test]
    fn test_whitelist_blocks_unknown() {
        let policy = ShellPolicy::whitelist(vec![
            WhitelistPattern::new(r"^echo(\s|$)", "echo").unwrap(),
        ]);
        let err = policy
            .authorize("curl http://example.com", "", false)
            .unwrap_err();
        assert!(err.to_string().contains("whitelist"));
    }

    #[test]
    fn test_whitelist_allows_without_callback() {
        let calls = StdArc::new(AtomicUsize::new(0));
        let calls_seen = StdArc::clone(&calls);
        let policy = ShellPolicy::whitelist(vec![
            WhitelistPattern::new(r"curl(\s|$)", "curl").unwrap(),
        ])
        .with_confirm(move |_, _, _, _| {
            calls_seen.fetch_add(1, Ordering::SeqCst);
            true
        });

        assert!(policy.authorize("curl http://example.com", "", false).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_whitelist_skips_blacklist() {
        // A whitelisted command is not re-checked for dangerous patterns
        let policy = ShellPolicy::whitelist(vec![
            WhitelistPattern::new(r"^sudo(\s|$)", "sudo allowed here").unwrap(),
        ]);
        assert!(policy.authorize("sudo ls", "", false).is_ok());
    }

    #[test]
    fn test_whitelist_checks_substitutions() {
        let policy = ShellPolicy::whitelist(vec![
            WhitelistPattern::new(r"^echo(\s|$)", "echo").unwrap(),
            WhitelistPattern::new(r"^ls(\s|$)", "ls").unwrap(),
        ]);

        // The inner substitution is not whitelisted
        let err = policy
            .authorize("echo $(curl http://evil.com)", "", false)
            .unwrap_err();
        assert!(matches!(err, ToolError::PolicyBlocked(_)));

        // Fully whitelisted, including the substitution
        assert!(policy.authorize("echo $(ls -la)", "", false).is_ok());
    }

    #[test]
    fn test_whitelist_ask_on_unknown() {
        let policy = ShellPolicy::whitelist(vec![])
            .with_ask_on_unknown(true)
            .with_confirm(|_, dangerous, reason, _| {
                assert!(!dangerous);
                assert!(reason.contains("whitelist"));
                true
            });
        assert!(policy.authorize("make test", "", false).is_ok());

        let deny = ShellPolicy::whitelist(vec![])
            .with_ask_on_unknown(true)
            .with_confirm(|_, _, _, _| false);
        assert!(deny.authorize("make test", "", false).is_err());
    }

    #[test]
    fn test_decompose_pipeline() {
        let segments = decompose_command("ls -la | grep foo && echo done");
        assert_eq!(segments, vec!["ls -la", "grep foo", "echo done"]);
    }

    #[test]
    fn test_decompose_substitutions() {
        let segments = decompose_command("echo $(ls -la)");
        assert_eq!(segments, vec!["echo $(ls -la)", "ls -la"]);

        let segments = decompose_command("echo `date`");
        assert_eq!(segments, vec!["echo `date`", "date"]);
    }

    #[test]
    fn test_decompose_nested_substitution() {
        let segments = decompose_command("echo $(cat $(find . -name x))");
        assert!(segments.contains(&"cat $(find . -name x)".to_string()));
        assert!(segments.contains(&"find . -name x".to_string()));
    }

    #[test]
    fn test_decompose_respects_quotes() {
        let segments = decompose_command("echo 'a | b' && ls");
        assert_eq!(segments, vec!["echo 'a | b'", "ls"]);

        let segments = decompose_command("echo \"x; y\"");
        assert_eq!(segments, vec!["echo \"x; y\""]);
    }
}
