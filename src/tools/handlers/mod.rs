// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool handler implementations.
//!
//! This module contains the implementations of all built-in tools.

mod bash;
mod batch;
mod edit_file;
mod fetch;
mod investigation;
mod list_files;
mod read_file;
mod skill;
mod subagent;

pub use bash::BashHandler;
pub use batch::BatchToolHandler;
pub use edit_file::EditFileHandler;
pub use fetch::{html_to_text, FetchHandler};
pub use investigation::{
    CompleteInvestigationHandler, EscalateInvestigationHandler, ReportInvestigationHandler,
};
pub use list_files::ListFilesHandler;
pub use read_file::ReadFileHandler;
pub use skill::ActivateSkillHandler;
pub use subagent::{DelegateHandler, TaskHandler};
