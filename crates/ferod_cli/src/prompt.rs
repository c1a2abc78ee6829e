use dialoguer::{Confirm, Input, Select};

use crate::scaffold::{Result, ScaffoldError};

/// Source of answers for the `create` questions
pub trait Prompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String>;
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
    fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize>;
}

/// Asks on the terminal
pub struct Interactive;

impl Prompter for Interactive {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input
            .interact_text()
            .map(|answer| answer.trim().to_string())
            .map_err(|cause| ScaffoldError::Prompt { cause })
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|cause| ScaffoldError::Prompt { cause })
    }

    fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(|cause| ScaffoldError::Prompt { cause })
    }
}

/// Takes every default without asking (`-y`)
pub struct AcceptDefaults;

impl Prompter for AcceptDefaults {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        default
            .map(str::to_string)
            .ok_or_else(|| ScaffoldError::MissingAnswer {
                prompt: prompt.to_string(),
            })
    }

    fn confirm(&self, _prompt: &str, default: bool) -> Result<bool> {
        Ok(default)
    }

    fn select(&self, _prompt: &str, _items: &[&str], default: usize) -> Result<usize> {
        Ok(default)
    }
}

#[cfg(test)]
pub mod test {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Replays canned answers in order; `None` means "take the default"
    pub struct Scripted {
        answers: RefCell<VecDeque<Option<String>>>,
    }

    impl Scripted {
        pub fn new<'a>(answers: impl IntoIterator<Item = Option<&'a str>>) -> Self {
            Self {
                answers: RefCell::new(answers.into_iter().map(|a| a.map(str::to_string)).collect()),
            }
        }

        fn next(&self, prompt: &str) -> Option<String> {
            self.answers
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted answer for {prompt:?}"))
        }
    }

    impl Prompter for Scripted {
        fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
            match self.next(prompt) {
                Some(answer) => Ok(answer),
                None => AcceptDefaults.input(prompt, default),
            }
        }

        fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
            Ok(self.next(prompt).map(|a| a == "y").unwrap_or(default))
        }

        fn select(&self, prompt: &str, items: &[&str], default: usize) -> Result<usize> {
            Ok(self
                .next(prompt)
                .and_then(|a| items.iter().position(|item| *item == a))
                .unwrap_or(default))
        }
    }
}
