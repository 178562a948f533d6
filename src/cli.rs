use std::path::PathBuf;

use clap::Parser;

use crate::action::Action;
use crate::config::{Credentials, SecretString};
use crate::error::{ChatError, Result};
use crate::llm::Provider;

/// Reader-chat: ask an LLM about the document you are reading
#[derive(Parser, Debug, Clone)]
#[command(name = "reader-chat")]
#[command(version)]
#[command(about = "Document chat panel with markdown and math rendering", long_about = None)]
pub struct Cli {
    /// Provider to start with (gemini, openrouter). Overrides config.
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Model to start with. Ignored if the provider does not offer it.
    #[arg(long)]
    pub model: Option<String>,

    /// Title of the document being discussed
    #[arg(long, value_name = "TITLE")]
    pub document_title: Option<String>,

    /// Render the conversation with the dark palette
    #[arg(long, default_value_t = false)]
    pub dark: bool,

    /// File the rendered conversation is written to
    #[arg(short, long, value_name = "FILE", default_value = "conversation.html")]
    pub output: PathBuf,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Directory holding chat.toml and the log file
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// API key for Google Gemini
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// API key for OpenRouter
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_api_key: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn credentials(&self) -> Credentials {
        let mut credentials = Credentials::new();
        for (provider, key) in [
            (Provider::Gemini, &self.gemini_api_key),
            (Provider::OpenRouter, &self.openrouter_api_key),
        ] {
            if let Some(key) = key {
                credentials.set(provider, SecretString::new(key.as_str()));
            }
        }
        credentials
    }
}

/// One line of terminal input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Panel(Vec<Action>),
    ListModels,
    Status,
    Quit,
}

/// Parse a line from stdin. Blank lines yield `None`.
///
/// Plain text is sent as a message; `/provider`, `/model` and `/key` each
/// open the settings, change one field and save.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(Some(Command::Panel(vec![
            Action::ChangeInput(line.to_string()),
            Action::Send,
        ])));
    };

    let (name, arg) = split_word(rest);
    let command = match name {
        "clear" => Command::Panel(vec![Action::ClearHistory]),
        "hide" => Command::Panel(vec![Action::SetPanelVisible(false)]),
        "show" => Command::Panel(vec![Action::SetPanelVisible(true)]),
        "provider" => {
            let provider: Provider = required(name, arg)?.parse()?;
            settings_edit(Action::SelectProvider(provider))
        }
        "model" => settings_edit(Action::SelectModel(required(name, arg)?.to_string())),
        "key" => {
            let (provider, secret) = split_word(required(name, arg)?);
            let provider: Provider = provider.parse()?;
            let secret = required(name, secret)?;
            settings_edit(Action::SetCredential(provider, SecretString::new(secret)))
        }
        "models" => Command::ListModels,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(ChatError::InvalidCommand(format!("/{}", other))),
    };
    Ok(Some(command))
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str> {
    if arg.is_empty() {
        Err(ChatError::InvalidCommand(format!("/{} needs an argument", name)))
    } else {
        Ok(arg)
    }
}

fn settings_edit(edit: Action) -> Command {
    Command::Panel(vec![Action::OpenSettings, edit, Action::SaveSettings])
}
