// ABOUTME: Configuration and constants for the Boop interpreter

pub const VERSION: &str = "1.0.0";
pub const WELCOME_MESSAGE: &str = "Boop Interpreter v1.0";
pub const WELCOME_SUBTITLE: &str = "A tree-walking interpreter for the Boop scripting language";
pub const WELCOME_FOOTER: &str = "Type a statement to evaluate it. Press Ctrl-D to exit.";
pub const PROMPT: &str = "boop> ";
pub const HISTORY_FILE: &str = ".boop_history";

/// Knobs that change evaluation semantics, wired through from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterOptions {
    /// Treat reading a nil-valued binding as an uninitialized-variable
    /// error instead of yielding nil.
    pub strict_uninitialized: bool,
}
