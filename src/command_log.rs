/// Entries kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 50;

/// Outcomes of the shell lines run this session, oldest first, capped at
/// `capacity` entries.
pub struct CommandLog {
    pub entries: Vec<CommandLogEntry>,
    capacity: usize,
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

pub struct CommandLogEntry {
    pub input: String,
    pub status: CommandStatus,
}

pub enum CommandStatus {
    Success { feedback: String },
    Failed { reason: String },
}

impl CommandLogEntry {
    pub fn display(&self) -> String {
        match &self.status {
            CommandStatus::Success { feedback } => {
                let first_line = feedback.lines().next().unwrap_or("");
                format!("✓ {}: {}", self.input, first_line)
            }
            CommandStatus::Failed { reason } => format!("✗ {}: {}", self.input, reason),
        }
    }
}

impl CommandLog {
    /// A log holding at most `capacity` entries; at least one is always kept.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn log_success(&mut self, input: impl Into<String>, feedback: impl Into<String>) {
        self.entries.push(CommandLogEntry {
            input: input.into(),
            status: CommandStatus::Success {
                feedback: feedback.into(),
            },
        });
        self.trim();
    }

    pub fn log_failure(&mut self, input: impl Into<String>, reason: impl Into<String>) {
        self.entries.push(CommandLogEntry {
            input: input.into(),
            status: CommandStatus::Failed {
                reason: reason.into(),
            },
        });
        self.trim();
    }

    fn trim(&mut self) {
        let excess = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..excess);
    }

    /// The last `n` entries, or all of them when fewer were logged.
    pub fn recent(&self, n: usize) -> &[CommandLogEntry] {
        &self.entries[self.entries.len().saturating_sub(n)..]
    }
}
