//! Per-operation control of the engine's diagnostic output.
//!
//! Engine plugins write large amounts of debug and trace output. Instead of
//! redirecting the process-wide stderr, each operation acquires a
//! `DiagnosticScope` and hands its mode to every child process it spawns.
//! Nothing global is touched, so operations on different clusters can run
//! side by side.

use std::process::Stdio;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticMode {
    /// Engine output goes to the caller's terminal.
    Inherit,
    /// Engine output is discarded.
    Suppressed,
}

impl DiagnosticMode {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            DiagnosticMode::Inherit
        } else {
            DiagnosticMode::Suppressed
        }
    }

    /// A fresh `Stdio` for one child stream.
    pub fn stdio(self) -> Stdio {
        match self {
            DiagnosticMode::Inherit => Stdio::inherit(),
            DiagnosticMode::Suppressed => Stdio::null(),
        }
    }
}

/// Diagnostic output policy held for the duration of one operation.
#[derive(Debug)]
pub struct DiagnosticScope {
    mode: DiagnosticMode,
    label: String,
}

impl DiagnosticScope {
    pub fn acquire(verbose: bool, label: impl Into<String>) -> Self {
        let scope = Self {
            mode: DiagnosticMode::from_verbose(verbose),
            label: label.into(),
        };
        if scope.mode == DiagnosticMode::Suppressed {
            trace!("suppressing engine diagnostics for {}", scope.label);
        }
        scope
    }

    #[inline]
    pub fn mode(&self) -> DiagnosticMode {
        self.mode
    }
}

impl Drop for DiagnosticScope {
    fn drop(&mut self) {
        if self.mode == DiagnosticMode::Suppressed {
            trace!("restored engine diagnostics for {}", self.label);
        }
    }
}
