//! Terminal output for braid commands.
//!
//! Progress, site summaries and diagnostics go to stderr so that
//! `braid build --json` leaves stdout holding only the resolved model.

use console::{Style, Term};

/// Writer for command output.
///
/// Write failures are ignored; a closed terminal must not fail a build.
pub(crate) struct Output {
    stderr: Term,
    stdout: Term,
    done: Style,
    skipped: Style,
    failed: Style,
    site: Style,
    path: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            stderr: Term::stderr(),
            stdout: Term::stdout(),
            done: Style::new().green(),
            skipped: Style::new().yellow(),
            failed: Style::new().red(),
            site: Style::new().cyan().bold(),
            path: Style::new().dim(),
        }
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.stderr.write_line(&style.apply_to(msg).to_string());
    }

    /// Plain progress line, such as one source of a summary or a cache entry.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.stderr.write_line(msg);
    }

    /// Content directory or other path under a summary line.
    pub(crate) fn detail(&self, msg: &str) {
        self.line(&self.path, msg);
    }

    /// Finished build, purge or reloading watch pass.
    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.done, msg);
    }

    /// Skipped source or dry-run notice.
    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.skipped, msg);
    }

    /// Failed command or watch pass.
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.failed, msg);
    }

    /// Site name heading a summary.
    pub(crate) fn highlight(&self, msg: &str) {
        self.line(&self.site, msg);
    }

    /// Resolved model for `--json`, the only thing written to stdout.
    pub(crate) fn result(&self, text: &str) {
        let _ = self.stdout.write_line(text);
    }
}
