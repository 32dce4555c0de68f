//! Human-friendly CLI output formatters.
//!
//! When `color` is true, ANSI escape codes are emitted via `owo_colors`.

use crate::services::{Advisory, SearchState};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Shown when the last cycle found no accounts.
pub const NO_USERS_FOUND: &str = "No users found";

// ── results ─────────────────────────────────────────────────────────────────

/// Prints the result list, one account per line. Sentinel slots are skipped.
pub fn fmt_state(w: &mut impl Write, state: &SearchState, color: bool) -> io::Result<()> {
    if state.no_results_found {
        if color {
            writeln!(w, "{}", NO_USERS_FOUND.dimmed())?;
        } else {
            writeln!(w, "{NO_USERS_FOUND}")?;
        }
        return Ok(());
    }

    let width = state
        .records()
        .map(|r| r.login.chars().count())
        .max()
        .unwrap_or(0);

    for record in state.records() {
        let repos = format!("Number of Repos: {}", record.public_repos);
        if color {
            writeln!(w, "{:<width$}  {}", record.login.bold(), repos.dimmed())?;
        } else {
            writeln!(w, "{:<width$}  {}", record.login, repos)?;
        }
    }

    let skipped = state.results.len() - state.records().count();
    if skipped > 0 {
        let note = format!("({skipped} more not shown: rate limit exceeded)");
        if color {
            writeln!(w, "{}", note.dimmed())?;
        } else {
            writeln!(w, "{note}")?;
        }
    }

    Ok(())
}

// ── advisories ──────────────────────────────────────────────────────────────

pub fn fmt_advisory(w: &mut impl Write, advisory: &Advisory, color: bool) -> io::Result<()> {
    match advisory {
        Advisory::QuotaExhausted { .. } if color => writeln!(w, "{}", advisory.red()),
        Advisory::QuotaLow { .. } if color => writeln!(w, "{}", advisory.yellow()),
        _ => writeln!(w, "{advisory}"),
    }
}
