//! Interactive prompts.

use std::io::IsTerminal;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::error::{Error, Result};

/// Prompts are only shown when both ends are a terminal.
#[must_use]
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Ask a yes/no question.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read.
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()
        .map_err(prompt_error)
}

/// Ask for a line of text, optionally pre-filled.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read.
pub fn input(message: &str, default: Option<&str>) -> Result<String> {
    let theme = ColorfulTheme::default();
    let mut prompt = Input::<String>::with_theme(&theme).with_prompt(message);
    if let Some(default) = default.filter(|d| !d.is_empty()) {
        prompt = prompt.default(default.to_string());
    }
    prompt
        .interact_text()
        .map(|s| s.trim().to_string())
        .map_err(prompt_error)
}

/// Pick one of `items`.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read.
pub fn select<T: std::fmt::Display>(message: &str, items: &[T], default: usize) -> Result<usize> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .items(items)
        .default(default)
        .interact()
        .map_err(prompt_error)
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Other(format!("Prompt failed: {e}"))
}
