//! # Progress Output
//!
//! Progress lines for the operator (what is being archived, what is being
//! waited for) go to stdout through a [`Reporter`]. Diagnostics go through
//! `log` to stderr instead, so redirecting stdout never hides a warning.
//!
//! Colors only ever touch the repository prefix and the final `Done.`, and
//! are decided once per run by [`color_wanted`].

use std::env;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use console::{style, Color};

use crate::config::Settings;
use crate::phases::RepositoryNode;

/// Whether progress lines are colored for `--color=<flag>`.
///
/// `always` and `never` are taken at their word. Anything else defers to the
/// environment: `NO_COLOR` (even empty) or `CLICOLOR=0` turn colors off, a
/// non-zero `CLICOLOR_FORCE` turns them on without a terminal, and otherwise
/// stdout has to be a color terminal other than `TERM=dumb`.
pub fn color_wanted(flag: &str) -> bool {
    if flag.eq_ignore_ascii_case("always") {
        return true;
    }
    if flag.eq_ignore_ascii_case("never") {
        return false;
    }

    let var = |name: &str| env::var(name).ok();
    if env::var_os("NO_COLOR").is_some() || var("CLICOLOR").as_deref() == Some("0") {
        return false;
    }
    match var("CLICOLOR_FORCE").as_deref() {
        Some(force) if !force.is_empty() && force != "0" => true,
        _ => {
            var("TERM").as_deref() != Some("dumb")
                && console::Term::stdout().features().colors_supported()
        }
    }
}

/// Writes the progress of an archive run.
pub struct Reporter {
    use_color: bool,
    settings: Settings,
    quiet: bool,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Reporter {
    /// Report to stdout.
    pub fn new(use_color: bool, settings: Settings, quiet: bool) -> Self {
        Self::with_writer(use_color, settings, quiet, Box::new(std::io::stdout()))
    }

    pub fn with_writer(
        use_color: bool,
        settings: Settings,
        quiet: bool,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            use_color,
            settings,
            quiet,
            out: Mutex::new(out),
        }
    }

    /// A reporter that prints nothing.
    pub fn silent() -> Self {
        Self::with_writer(false, Settings::default(), true, Box::new(std::io::sink()))
    }

    fn line(&self, text: &str) {
        if self.quiet {
            return;
        }
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        // Progress output is best effort; a closed stdout must not fail the run
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.use_color {
            style(text).fg(color).force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }

    /// Announce the archive job for `node`, either launched or only planned.
    pub fn job(&self, index: usize, prefix: &str, node: &RepositoryNode, segment: &Path, dry_run: bool) {
        let mut msg = format!("git archive {}: {}", index + 1, self.paint(prefix, Color::Cyan));
        if self.settings.debug {
            msg.push_str(&format!(
                "\n  gitdir:{:?} at:{} output:{:?}",
                node.store.path().display().to_string(),
                node.revision,
                segment.display().to_string()
            ));
        }
        if dry_run {
            self.line(&format!("Dry-run: {}", msg));
        } else {
            self.line(&format!("Launching {}", msg));
        }
    }

    pub fn waiting(&self, current: usize, total: usize) {
        self.line(&format!("Waiting and concatenating {}/{}...", current, total));
    }

    pub fn dry_run_done(&self) {
        self.line("Dry-run done.");
    }

    pub fn done(&self) {
        self.line(&self.paint("Done.", Color::Green));
    }
}
