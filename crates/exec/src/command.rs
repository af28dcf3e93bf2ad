//! Immutable command model and its append-only builder.

use indexmap::IndexMap;

/// The program name of the wrapped metadata CLI
pub const CLI_PROGRAM: &str = "sf";

/// An immutable description of one command-line invocation.
///
/// Rendering to a command-line string is deterministic: program, then args in
/// insertion order, then flags in insertion order. Tests assert exact string
/// equality on the rendered form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    flags: IndexMap<String, String>,
    description: Option<String>,
    log_name: Option<String>,
}

impl Command {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn flags(&self) -> &IndexMap<String, String> {
        &self.flags
    }

    /// Human-readable description, used only by UI surfaces
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Metric key, used only by telemetry
    pub fn log_name(&self) -> Option<&str> {
        self.log_name.as_deref()
    }

    /// The full argument vector handed to the OS, flags expanded in
    /// insertion order after the positional args. Empty flag values are
    /// passed through as empty tokens (some flags legitimately take one).
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.args.clone();
        for (name, value) in &self.flags {
            argv.push(name.clone());
            argv.push(value.clone());
        }
        argv
    }

    /// Deterministic rendering for logging and golden-string tests. Empty
    /// flag values render as `""` so the output stays unambiguous.
    pub fn to_command_line(&self) -> String {
        let mut tokens = Vec::with_capacity(1 + self.args.len() + self.flags.len() * 2);
        tokens.push(self.program.clone());
        tokens.extend(self.args.iter().cloned());
        for (name, value) in &self.flags {
            tokens.push(name.clone());
            if value.is_empty() {
                tokens.push("\"\"".to_string());
            } else {
                tokens.push(value.clone());
            }
        }
        tokens.join(" ")
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// Append-only builder for [`Command`].
///
/// Every method consumes and returns the builder, so call chains are
/// side-effect free; `build()` never fails.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    flags: IndexMap<String, String>,
    description: Option<String>,
    log_name: Option<String>,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            flags: IndexMap::new(),
            description: None,
            log_name: None,
        }
    }

    /// Builder preset for the wrapped metadata CLI
    pub fn sf() -> Self {
        Self::new(CLI_PROGRAM)
    }

    /// Append one positional token
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Upsert one flag; later values for the same flag win, original
    /// insertion position is kept
    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    /// Convenience for the CLI's `--json` output switch
    pub fn with_json(self) -> Self {
        self.with_arg("--json")
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_log_name(mut self, log_name: impl Into<String>) -> Self {
        self.log_name = Some(log_name.into());
        self
    }

    pub fn build(self) -> Command {
        Command {
            program: self.program,
            args: self.args,
            flags: self.flags,
            description: self.description,
            log_name: self.log_name,
        }
    }
}
