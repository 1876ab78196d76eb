// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Progress notifications for long-running steps.
//!
//! Writers announce each step with [`Progress::begin`] and close it with
//! [`Progress::end`]. Diagnostics go through `tracing` instead.

/// Receiver of scoped progress notifications.
pub trait Progress {
    /// A step described by `description` starts.
    fn begin(&mut self, description: &str);

    /// The most recently started step has finished.
    fn end(&mut self);
}

/// Discards all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {
    fn begin(&mut self, _description: &str) {}

    fn end(&mut self) {}
}

/// Prints `<description> ... done.` lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl Progress for Console {
    fn begin(&mut self, description: &str) {
        eprint!("{description} ... ");
    }

    fn end(&mut self) {
        eprintln!("done.");
    }
}
