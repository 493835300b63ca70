//! Command lines for child processes.
//!
//! Every process loadprof launches (target server, profiler, report stages)
//! is described by a `CommandLine`: a program plus its argument vector,
//! tokenised with POSIX shell rules but never executed through a shell.

use crate::errors::{ProcessError, ProcessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A program and its arguments.
///
/// # Example
/// ```
/// use loadprof_common::CommandLine;
///
/// let cmd = CommandLine::parse("perf record -p {pid} -o 'my capture.data'").unwrap();
/// assert_eq!(cmd.program(), "perf");
/// assert_eq!(cmd.args().last().unwrap(), "my capture.data");
///
/// let cmd = cmd.render(&[("pid", "42")]);
/// assert_eq!(cmd.args()[2], "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Creates a command line from an already split program and arguments.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits `line` into tokens using shell quoting rules.
    pub fn parse(line: &str) -> ProcessResult<Self> {
        let mut tokens = shlex::split(line)
            .ok_or_else(|| ProcessError::invalid_command(line, "unbalanced quotes or trailing escape"))?
            .into_iter();

        let program = tokens
            .next()
            .ok_or_else(|| ProcessError::invalid_command(line, "command line is empty"))?;

        Ok(Self {
            program,
            args: tokens.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Substitutes `{key}` placeholders in the program and every argument.
    ///
    /// Substitution happens after tokenisation, so values containing spaces
    /// stay a single argument.
    pub fn render(&self, values: &[(&str, &str)]) -> Self {
        let substitute = |token: &str| {
            values.iter().fold(token.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{}}}", key), value)
            })
        };

        Self {
            program: substitute(&self.program),
            args: self.args.iter().map(|arg| substitute(arg)).collect(),
        }
    }

    /// Returns a copy with `extra` appended to the argument vector.
    pub fn with_args<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = self.args.clone();
        args.extend(extra.into_iter().map(Into::into));
        Self {
            program: self.program.clone(),
            args,
        }
    }

    /// Whether any token contains the `{key}` placeholder.
    pub fn references(&self, key: &str) -> bool {
        let placeholder = format!("{{{}}}", key);
        self.tokens().any(|token| token.contains(&placeholder))
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

/// Characters that never need quoting, placeholder braces included.
fn is_plain(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@%+{}".contains(c))
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if is_plain(token) {
                f.write_str(token)?;
            } else {
                match shlex::try_quote(token) {
                    Ok(quoted) => f.write_str(&quoted)?,
                    Err(_) => f.write_str(token)?,
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for CommandLine {
    type Error = ProcessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::str::FromStr for CommandLine {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<CommandLine> for String {
    fn from(value: CommandLine) -> Self {
        value.to_string()
    }
}
