// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Layered safety policy for the engine.
//!
//! Three guards are applied before any privileged action:
//!
//! - [`path`] - filesystem paths are resolved against the working root and
//!   traversal attempts are rejected
//! - [`url`] - URLs are restricted to public http/https hosts (SSRF guard)
//! - [`command`] - shell commands pass a dangerous-pattern classifier, an
//!   optional whitelist, and an optional confirmation callback

pub mod command;
pub mod path;
pub mod url;

pub use command::{PolicyMode, ShellPolicy, WhitelistPattern};
pub use path::resolve_within_root;
pub use url::validate_url;
