// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User confirmation.
//!
//! Operations that overwrite files or change installed packages ask the user
//! first. Declining is not an error. The operation just reports that it was
//! cancelled.

use indicatif::ProgressBar;
use inquire::{Confirm, InquireError};

/// Ask user for a yes or no decision.
pub trait Confirmation {
    /// Ask for confirmation of `message`.
    ///
    /// # Errors
    ///
    /// - Return [`PromptError`] if user cannot be asked at all.
    fn confirm(&self, message: &str) -> Result<bool>;
}

impl<C> Confirmation for Box<C>
where
    C: Confirmation + ?Sized,
{
    fn confirm(&self, message: &str) -> Result<bool> {
        (**self).confirm(message)
    }
}

/// Confirmation through interactive terminal prompt.
///
/// Suspends an optional progress bar while the prompt is shown.
#[derive(Debug, Default, Clone)]
pub struct InquirePrompt {
    bar: Option<ProgressBar>,
}

impl InquirePrompt {
    /// Construct new terminal prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend `bar` while prompting.
    pub fn with_progress_bar(bar: ProgressBar) -> Self {
        Self { bar: Some(bar) }
    }

    fn ask(message: &str) -> Result<bool> {
        match Confirm::new(message).with_default(false).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
            Err(err) => Err(PromptError(err)),
        }
    }
}

impl Confirmation for InquirePrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        match &self.bar {
            Some(bar) => bar.suspend(|| Self::ask(message)),
            None => Self::ask(message),
        }
    }
}

/// Confirmation that always gives the same answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssumeAnswer(pub bool);

impl AssumeAnswer {
    pub const YES: Self = Self(true);
    pub const NO: Self = Self(false);
}

impl Confirmation for AssumeAnswer {
    fn confirm(&self, _message: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// Result of an operation the user may decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Operation ran to completion.
    Done,

    /// User declined the operation.
    Cancelled,
}

/// User cannot be prompted.
#[derive(Debug, thiserror::Error)]
#[error("failed to prompt for confirmation")]
pub struct PromptError(#[source] pub InquireError);

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assumed_answers_through_box() -> anyhow::Result<()> {
        let yes: Box<dyn Confirmation> = Box::new(AssumeAnswer::YES);
        let no: Box<dyn Confirmation> = Box::new(AssumeAnswer::NO);
        assert!(yes.confirm("Proceed?")?);
        assert!(!no.confirm("Proceed?")?);

        Ok(())
    }
}
