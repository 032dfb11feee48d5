use std::fmt;

/// An executable unit of work against a model.
pub trait Command<M> {
    type Output;
    type Error;

    fn execute(&self, model: &mut M) -> Result<Self::Output, Self::Error>;
}

/// A command that has already been applied and knows how to reverse and
/// re-apply itself.
///
/// The undo and redo forms share the output and error types of the entry,
/// so the history can hand results back without knowing what they mean.
pub trait ReversibleCommand<M> {
    type Output;
    type Error;
    type Undo: Command<M, Output = Self::Output, Error = Self::Error>;
    type Redo: Command<M, Output = Self::Output, Error = Self::Error>;

    fn undo_command(&self) -> Self::Undo;

    fn redo_command(&self) -> Self::Redo;

    /// The result originally reported when this command ran forward.
    fn describe(&self) -> Self::Output;
}

/// User-facing outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub feedback: String,
}

impl CommandResult {
    pub fn new(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.feedback)
    }
}
