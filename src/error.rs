// ABOUTME: Error types and the diagnostic reporter shared by all pipeline stages

use crate::token::Token;
use thiserror::Error;

/// Signal raised inside the parser's recursive descent and caught at the
/// declaration boundary, where it triggers panic-mode synchronization. The
/// human-readable diagnostic has already been recorded through the
/// [`ErrorReporter`] by the time this value exists.
#[derive(Error, Debug, Clone, Copy)]
#[error("parse error")]
pub struct ParseError;

/// Error raised during evaluation: type mismatch, division by zero,
/// undefined variable, arity mismatch, non-callable target, and friends.
/// Carries the offending token's line so the reporter can localize it.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RuntimeError {
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError {
            line: token.line,
            message: message.into(),
        }
    }
}

/// One collected diagnostic record.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub line: usize,
    pub location: String,
    pub message: String,
}

/// Central reporter: collects diagnostics in encounter order, prints them to
/// stderr, and tracks whether any phase has failed. A program counts as
/// successfully run only if both flags stay false across scan, parse, and
/// evaluation.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
    had_runtime_error: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scan or parse error at the given line.
    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.add(line, String::new(), message.into());
        self.had_error = true;
    }

    /// Record a parse error at a specific token, naming its lexeme.
    pub fn error_at_token(&mut self, token: &Token, message: impl Into<String>) {
        use crate::token::TokenKind;
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        self.add(token.line, location, message.into());
        self.had_error = true;
    }

    /// Record a recovered runtime error.
    pub fn runtime_error(&mut self, error: &RuntimeError) {
        self.add(error.line, String::new(), error.message.clone());
        self.had_runtime_error = true;
    }

    fn add(&mut self, line: usize, location: String, message: String) {
        self.diagnostics.push(Diagnostic {
            line,
            location,
            message,
        });
    }

    /// Print every collected diagnostic to stderr in encounter order and
    /// drain the list. The failure flags are left set.
    pub fn report(&mut self) {
        for d in self.diagnostics.drain(..) {
            eprintln!("[Line {}] Error{}: {}", d.line, d.location, d.message);
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Reset flags between REPL lines so one bad line does not poison the
    /// next one.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    #[test]
    fn test_reporter_tracks_error_flag() {
        let mut reporter = ErrorReporter::new();
        assert!(!reporter.had_error());

        reporter.error(3, "Unexpected character: @");
        assert!(reporter.had_error());
        assert!(!reporter.had_runtime_error());
    }

    #[test]
    fn test_runtime_error_sets_its_own_flag() {
        let mut reporter = ErrorReporter::new();
        let token = Token::new(TokenKind::Slash, "/", None, 9);
        let error = RuntimeError::new(&token, "Division by zero is illegal");

        reporter.runtime_error(&error);
        assert!(reporter.had_runtime_error());
        assert!(!reporter.had_error());
        assert_eq!(error.line, 9);
    }

    #[test]
    fn test_clear_resets_flags() {
        let mut reporter = ErrorReporter::new();
        reporter.error(1, "Expect expression.");
        reporter.clear();
        assert!(!reporter.had_error());
    }
}
