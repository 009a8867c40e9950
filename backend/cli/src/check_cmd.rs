//! `chanlogs check`: report config errors and warnings.

use std::path::Path;

use anyhow::{bail, Result};

use chanlogs_config::{validate, ChanlogsConfig};

use crate::terminal_output::{note_error, note_success, note_warn};

pub fn run(config_path: &Path, config: &ChanlogsConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        note_warn(&warning.to_string());
    }
    for err in &report.errors {
        note_error(&err.to_string());
    }
    if !report.is_valid() {
        bail!("{} is invalid ({} error(s))", config_path.display(), report.errors.len());
    }
    note_success(&format!("{} is valid", config_path.display()));
    Ok(())
}
