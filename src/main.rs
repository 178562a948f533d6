use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use reader_chat::action::Action;
use reader_chat::app::{ActiveConfiguration, ChatPanel, DocumentContext};
use reader_chat::cli::{parse_command, Cli, Command};
use reader_chat::config::ConfigManager;
use reader_chat::llm::{ProviderClient, Role};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse_args();
    let mut config = match &cli.config_dir {
        Some(dir) => ConfigManager::with_dir(dir),
        None => ConfigManager::new()?,
    };
    let _log_guard = init_tracing(&config, &cli.log_level)?;

    let chat_config = config.chat_config();
    let provider = cli.provider.unwrap_or(chat_config.defaults.provider);
    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| chat_config.model_for_provider(provider).to_string());
    let dark = cli.dark || chat_config.defaults.dark_theme;
    let client = ProviderClient::shared(&chat_config.request);

    let mut panel = ChatPanel::new(ActiveConfiguration::new(provider, model, cli.credentials()), client);
    if let Some(title) = &cli.document_title {
        panel.set_document_context(Some(DocumentContext::new(title.as_str())));
    }
    tracing::info!("Starting with {}", panel.session().status_line());

    write_conversation(&panel, &cli.output, dark)?;
    println!("{}  (/models, /provider, /model, /key, /clear, /hide, /show, /status, /quit)", panel.session().status_line());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_closed = false;
    loop {
        tokio::select! {
            finished = panel.next_completion(), if panel.session().is_sending() => {
                if finished? {
                    report_completion(&panel);
                    write_conversation(&panel, &cli.output, dark)?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    stdin_closed = true;
                    break;
                };
                if !handle_line(&mut panel, &mut config, &line) {
                    break;
                }
                write_conversation(&panel, &cli.output, dark)?;
            }
        }
    }

    // Piped input: let the last question finish before exiting
    if stdin_closed && panel.next_completion().await? {
        report_completion(&panel);
        write_conversation(&panel, &cli.output, dark)?;
    }

    tracing::info!("Exiting");
    Ok(())
}

fn init_tracing(config: &ConfigManager, level: &str) -> Result<WorkerGuard> {
    config.ensure_config_dir()?;
    let file_appender = tracing_appender::rolling::never(config.config_dir(), config.log_file_name());
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err("Invalid log level")?;
    let file_layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .wrap_err("Failed to initialize tracing")?;
    Ok(guard)
}

/// Apply one line of input. Returns false when the user asked to quit.
fn handle_line(panel: &mut ChatPanel, config: &mut ConfigManager, line: &str) -> bool {
    let command = match parse_command(line) {
        Ok(Some(command)) => command,
        Ok(None) => return true,
        Err(e) => {
            eprintln!("{}", e);
            return true;
        }
    };

    match command {
        Command::Quit => return false,
        Command::Status => print_status(panel),
        Command::ListModels => print_models(panel),
        Command::Panel(actions) => {
            let saves_settings = actions.contains(&Action::SaveSettings);
            let already_sending = panel.session().is_sending() && actions.contains(&Action::Send);
            for action in actions {
                panel.dispatch(action);
            }
            if saves_settings {
                persist_settings(config, panel.active_configuration());
                println!("{}", panel.session().status_line());
            }
            if already_sending {
                eprintln!("A reply is still pending; message not sent");
            }
        }
    }
    true
}

fn persist_settings(config: &mut ConfigManager, active: &ActiveConfiguration) {
    let chat_config = config.chat_config_mut();
    chat_config.defaults.provider = active.provider();
    chat_config.set_model_for_provider(active.provider(), active.model());
    if let Err(e) = config.save_chat_config() {
        tracing::warn!("Failed to save chat config: {}", e);
        eprintln!("Settings not saved: {}", e);
    }
}

fn report_completion(panel: &ChatPanel) {
    let session = panel.session();
    if let Some(error) = session.last_error() {
        eprintln!("Error: {}", error);
        return;
    }
    if !session.panel_visible() {
        return;
    }
    if let Some(reply) = session.messages().last().filter(|m| m.role() == Role::Assistant) {
        println!("\n{}\n", reply.content());
    }
}

fn print_status(panel: &ChatPanel) {
    let session = panel.session();
    let active = panel.active_configuration();
    let provider = active.provider();
    let model_name = provider.model_info(active.model()).map_or(active.model(), |m| m.name);
    let key_state = if active.credentials().has(provider) { "set" } else { "missing" };
    println!("{}", session.status_line());
    println!("model: {}  API key: {}", model_name, key_state);
    println!(
        "messages: {}  state: {:?}  panel: {}",
        session.messages().len(),
        session.status(),
        if session.panel_visible() { "visible" } else { "hidden" }
    );
    if let Some(document) = session.document() {
        println!("document: {}", document.title);
    }
    if let Some(error) = session.last_error() {
        println!("last error: {}", error);
    }
}

fn print_models(panel: &ChatPanel) {
    let active = panel.active_configuration();
    let provider = active.provider();
    println!("{} models:", provider.display_name());
    for model in provider.supported_models() {
        let marker = if model.id == active.model() { "*" } else { " " };
        println!(" {} {:<32} {}", marker, model.id, model.name);
    }
}

/// Write the rendered conversation; a hidden panel leaves the file as it was
fn write_conversation(panel: &ChatPanel, output: &Path, dark: bool) -> Result<()> {
    if !panel.session().panel_visible() {
        return Ok(());
    }
    let rendered = panel.render(dark);
    std::fs::write(output, rendered.document)
        .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}
