//! Command and working-directory validation for shell steps.
//!
//! A shell step is never spawned unless its command passes a
//! [`CommandValidator`] and the plan's project path passes a
//! [`PathValidator`]. The defaults here are an allowlist of program names and
//! a canonicalizing root check.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

/// Programs the default command validator accepts.
pub const DEFAULT_ALLOWED_PROGRAMS: &[&str] = &[
    "echo", "ls", "cat", "pwd", "true", "false", "git", "cargo", "rustc", "npm", "npx", "pnpm",
    "yarn", "node", "python", "python3", "pip", "make", "go", "grep", "find", "mkdir", "touch",
];

const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '>', '<', '`', '\n', '\r'];

/// Verdict on a command string.
///
/// When valid, `parts` holds the argument vector (program first) the command
/// must be spawned with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandValidation {
    pub valid: bool,
    pub error: Option<String>,
    pub parts: Vec<String>,
}

impl CommandValidation {
    pub fn accepted(parts: Vec<String>) -> Self {
        Self {
            valid: true,
            error: None,
            parts,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            parts: Vec::new(),
        }
    }
}

/// Verdict on a working directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathValidation {
    pub valid: bool,
    pub error: Option<String>,
}

impl PathValidation {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Decides whether a command string may be run.
pub trait CommandValidator: Send + Sync {
    fn validate_command_string(&self, command: &str) -> CommandValidation;
}

/// Decides whether a directory may be used as a working directory.
#[async_trait]
pub trait PathValidator: Send + Sync {
    async fn validate_path(&self, path: &Path, allowed_roots: &[PathBuf]) -> PathValidation;
}

/// Accepts commands whose program is on an allowlist and that contain no
/// shell metacharacters.
#[derive(Debug, Clone)]
pub struct AllowlistCommandValidator {
    allowed: HashSet<String>,
}

impl AllowlistCommandValidator {
    pub fn new<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: programs.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for AllowlistCommandValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_PROGRAMS.iter().copied())
    }
}

impl CommandValidator for AllowlistCommandValidator {
    fn validate_command_string(&self, command: &str) -> CommandValidation {
        if let Some(c) = command.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
            return CommandValidation::rejected(format!(
                "Shell metacharacter {c:?} is not allowed"
            ));
        }

        let parts = match split_command(command) {
            Ok(parts) => parts,
            Err(e) => return CommandValidation::rejected(e),
        };
        let Some(program) = parts.first() else {
            return CommandValidation::rejected("Command is empty");
        };

        // Match on the file name so `/usr/bin/git` is treated like `git`.
        let name = Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program);
        if !self.allowed.contains(name) {
            return CommandValidation::rejected(format!("Command '{name}' is not allowed"));
        }

        CommandValidation::accepted(parts)
    }
}

/// Split a command line into arguments, honoring single and double quotes
/// and backslash escapes outside single quotes.
pub fn split_command(command: &str) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => match chars.next() {
                Some(escaped) => {
                    current.push(escaped);
                    in_word = true;
                }
                None => return Err("Trailing backslash".to_string()),
            },
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    parts.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("Unterminated quote".to_string());
    }
    if in_word {
        parts.push(current);
    }
    Ok(parts)
}

/// Accepts existing directories that resolve inside one of the allowed
/// roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootPathValidator;

#[async_trait]
impl PathValidator for RootPathValidator {
    async fn validate_path(&self, path: &Path, allowed_roots: &[PathBuf]) -> PathValidation {
        let resolved = match tokio::fs::canonicalize(path).await {
            Ok(resolved) => resolved,
            Err(e) => {
                return PathValidation::rejected(format!(
                    "Cannot resolve '{}': {e}",
                    path.display()
                ))
            }
        };

        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return PathValidation::rejected(format!(
                    "'{}' is not a directory",
                    path.display()
                ))
            }
        }

        for root in allowed_roots {
            // Roots that do not exist cannot contain anything.
            let Ok(root) = tokio::fs::canonicalize(root).await else {
                continue;
            };
            if resolved.starts_with(&root) {
                return PathValidation::accepted();
            }
        }

        PathValidation::rejected(format!(
            "'{}' is outside the allowed directories",
            path.display()
        ))
    }
}
