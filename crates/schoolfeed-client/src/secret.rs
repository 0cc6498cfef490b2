//! Secret references in configuration values.
//!
//! Credential values in `config.toml` may point elsewhere instead of holding
//! the secret inline:
//!
//! - `env::UNTIS_PASSWORD` reads an environment variable
//! - `pass::school/untis` takes the first line of `pass show school/untis`
//!
//! Any other value is used verbatim.

use std::process::Command;

use crate::error::{ClientError, ClientResult};

/// Where a configured value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// The value itself.
    Plain(&'a str),
    /// An environment variable name.
    Env(&'a str),
    /// A path in the `pass` password store.
    Pass(&'a str),
}

impl<'a> SecretRef<'a> {
    /// Classifies a configured value by its prefix.
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else {
            Self::Plain(value)
        }
    }

    /// Looks the value up.
    pub fn resolve(self) -> ClientResult<String> {
        match self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env(var) => std::env::var(var).map_err(|_| {
                ClientError::config(format!("environment variable `{}` is not set", var))
            }),
            Self::Pass(path) => pass_show(path),
        }
    }
}

/// Resolves a configured value that may be a secret reference.
pub fn resolve(value: &str) -> ClientResult<String> {
    SecretRef::parse(value).resolve()
}

fn pass_show(path: &str) -> ClientResult<String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| ClientError::config(format!("cannot run `pass show {}`: {}", path, e)))?;

    if !output.status.success() {
        return Err(ClientError::config(format!(
            "`pass show {}` exited with {}: {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| ClientError::config(format!("`pass show {}` printed nothing", path)))
}
