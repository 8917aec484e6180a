//! Command-line front-end.
//!
//! Parses arguments, validates prompts before they reach the generation
//! core, and prints results.

mod args;
mod commands;

pub use args::{Args, Command, PromptArgs};
pub use commands::{run, validate_prompt, MAX_PROMPT_CHARS};
