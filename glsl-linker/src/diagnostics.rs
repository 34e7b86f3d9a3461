// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

//! link status and info log

use crate::errors::LinkError;
use std::fmt::Write;

/// append-only record of everything reported during one link
#[derive(Clone, Debug)]
pub struct Diagnostics {
    info_log: String,
    link_status: bool,
    errors: Vec<LinkError>,
    warnings: Vec<LinkError>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            info_log: String::new(),
            link_status: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl Diagnostics {
    /// a fresh, successful link state
    pub fn new() -> Self {
        Self::default()
    }
    /// report an error; the link fails but keeps going
    pub fn error(&mut self, error: impl Into<LinkError>) {
        let error = error.into();
        tracing::debug!(%error, "link error");
        let _ = writeln!(self.info_log, "error: {}", error);
        self.link_status = false;
        self.errors.push(error);
    }
    /// report a warning
    pub fn warning(&mut self, warning: impl Into<LinkError>) {
        let warning = warning.into();
        tracing::warn!(%warning, "link warning");
        let _ = writeln!(self.info_log, "warning: {}", warning);
        self.warnings.push(warning);
    }
    /// report `diagnostic` as a warning when `as_warning` is set, otherwise as an error
    pub fn error_or_warning(&mut self, as_warning: bool, diagnostic: impl Into<LinkError>) {
        if as_warning {
            self.warning(diagnostic)
        } else {
            self.error(diagnostic)
        }
    }
    /// `true` while no error has been reported
    pub fn link_status(&self) -> bool {
        self.link_status
    }
    /// the accumulated log, one `error: ` or `warning: ` line per diagnostic
    pub fn info_log(&self) -> &str {
        &self.info_log
    }
    /// all errors in report order
    pub fn errors(&self) -> &[LinkError] {
        &self.errors
    }
    /// all warnings in report order
    pub fn warnings(&self) -> &[LinkError] {
        &self.warnings
    }
    /// number of errors so far; compare before and after a step to see if it failed
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MissingMain;
    use crate::errors::PositionNotWritten;

    #[test]
    fn test_info_log() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.link_status());
        diagnostics.warning(PositionNotWritten { stage: "vertex" });
        assert!(diagnostics.link_status());
        diagnostics.error(MissingMain { stage: "fragment" });
        assert!(!diagnostics.link_status());
        assert_eq!(
            diagnostics.info_log(),
            "warning: vertex shader does not write to `gl_Position'\n\
             error: fragment shader lacks `main'\n"
        );
        assert_eq!(diagnostics.errors().len(), 1);
        assert_eq!(diagnostics.warnings().len(), 1);
    }
}
