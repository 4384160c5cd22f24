//! StartCommand value object
//! Executable plus explicit argument vector; never interpreted by a shell

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCommand {
    program: String,
    #[serde(default)]
    args: Vec<String>,
}

impl StartCommand {
    pub fn new(program: impl Into<String>) -> Result<Self, DomainError> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(DomainError::InvalidCommand("Empty command".to_string()));
        }
        if program.contains('\0') {
            return Err(DomainError::InvalidCommand(format!(
                "Command '{}' contains a NUL byte",
                program.escape_default()
            )));
        }
        Ok(Self {
            program,
            args: Vec::new(),
        })
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for StartCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}
