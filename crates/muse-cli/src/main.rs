use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Editor;
use rustyline::{Context, Helper};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use muse_application::{ConversationController, DispatchOutcome, IgnoreReason};
use muse_core::config::StudioConfig;
use muse_core::conversation::{ActionKind, PostPreview, Turn};
use muse_core::responder::Responder;
use muse_interaction::{ScriptedResponder, WebhookResponder};

/// Muse REPL - compose social posts in conversation with an assistant.
#[derive(Parser)]
#[command(name = "muse")]
#[command(about = "Muse - assistant-guided studio for composing social posts", long_about = None)]
struct Cli {
    /// Path to a muse.toml configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Responder webhook endpoint (overrides configuration)
    #[arg(long)]
    endpoint: Option<String>,

    /// Use the offline scripted responder
    #[arg(long)]
    mock: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/actions".to_string(),
                "/help".to_string(),
                "/new".to_string(),
                "/post".to_string(),
                "/quit".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Picks the responder implementation from flags, config, and environment.
///
/// Order: `--mock` forces the scripted responder, `--endpoint` overrides
/// the configured endpoint, then the config file, then the environment.
/// Without any endpoint the REPL falls back to the scripted responder so
/// the studio stays usable offline.
fn build_responder(cli: &Cli, config: &StudioConfig) -> Result<(Arc<dyn Responder>, String)> {
    if cli.mock {
        let responder = ScriptedResponder::new().with_latency(Duration::from_millis(400));
        return Ok((Arc::new(responder), "scripted (offline)".to_string()));
    }

    let mut responder_config = config.responder.clone();
    if let Some(endpoint) = &cli.endpoint {
        responder_config.endpoint = Some(endpoint.clone());
    }

    if responder_config.endpoint.is_some() {
        let webhook = WebhookResponder::from_config(&responder_config)?;
        let label = format!("webhook at {}", webhook.endpoint());
        return Ok((Arc::new(webhook), label));
    }

    if let Ok(webhook) = WebhookResponder::try_from_env() {
        let label = format!("webhook at {}", webhook.endpoint());
        return Ok((Arc::new(webhook), label));
    }

    let responder = ScriptedResponder::new().with_latency(Duration::from_millis(400));
    Ok((
        Arc::new(responder),
        "scripted (no endpoint configured)".to_string(),
    ))
}

fn print_help() {
    println!("{}", "Commands:".bright_black());
    println!(
        "{}",
        "  /actions  show the currently offered quick actions".bright_black()
    );
    println!("{}", "  /new      start a new conversation".bright_black());
    println!("{}", "  /post     show the latest post draft".bright_black());
    println!("{}", "  /help     show this help".bright_black());
    println!("{}", "  /quit     exit".bright_black());
    println!(
        "{}",
        "Anything else is sent to the assistant; a number picks a quick action.".bright_black()
    );
}

fn print_actions(turn: &Turn) {
    println!("{}", "Suggested next steps:".bright_black());
    for (i, action) in turn.actions.iter().enumerate() {
        let label = format!("  [{}] {}", i + 1, action.label);
        match action.kind {
            ActionKind::Primary => println!("{}", label.bright_cyan()),
            ActionKind::Secondary => println!("{}", label.cyan()),
        }
    }
}

fn print_post(post: &PostPreview) {
    println!();
    println!("{}", "--- Post preview ---".bright_magenta());
    match &post.image {
        Some(image) => println!("{}", format!("image: {}", image).bright_black()),
        None => println!("{}", "image: (none yet)".bright_black()),
    }
    println!("{}", post.caption);
    println!("{}", post.hashtags.as_str().cyan());
    println!("{}", "--------------------".bright_magenta());
}

/// Renders one dispatch outcome, waiting out the reveal delay before
/// offering the new turn's quick actions.
async fn render_outcome(
    controller: &ConversationController,
    reveal_delay: Duration,
    outcome: DispatchOutcome,
) {
    match outcome {
        DispatchOutcome::Replied(message) => {
            for line in message.lines() {
                println!("{}", line.bright_blue());
            }

            let snapshot = controller.snapshot().await;
            let Some(turn) = snapshot.turns.last() else {
                return;
            };
            if let Some(post) = &turn.attached_post {
                print_post(post);
            }
            if !turn.actions.is_empty() {
                // Let the scheduled reveal land before rendering.
                tokio::time::sleep(reveal_delay + Duration::from_millis(50)).await;
                let snapshot = controller.snapshot().await;
                if let Some(visible) = snapshot.visible_turn() {
                    println!();
                    print_actions(visible);
                }
            }
        }
        DispatchOutcome::Ignored(IgnoreReason::EmptyInput) => {}
        DispatchOutcome::Ignored(IgnoreReason::Busy) => {
            println!("{}", "Still working on the previous message.".yellow());
        }
        DispatchOutcome::Ignored(IgnoreReason::SessionReset) => {
            println!(
                "{}",
                "The conversation was reset; that reply was discarded.".bright_black()
            );
        }
        DispatchOutcome::Failed(notice) => {
            println!("{}", notice.red());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => StudioConfig::load(path)?,
        None => StudioConfig::default(),
    };

    let (responder, responder_label) = build_responder(&cli, &config)?;
    let reveal_delay = config.conversation.reveal_delay();
    let controller = ConversationController::new(responder, config.conversation);

    // ===== REPL Setup =====
    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Muse Studio ===".bright_magenta().bold());
    println!("{}", format!("Responder: {}", responder_label).bright_black());
    println!(
        "{}",
        "Describe the post you want to share. Type /help for commands.".bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "/quit" || trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                match trimmed {
                    "/help" => {
                        print_help();
                        continue;
                    }
                    "/new" => {
                        controller.reset().await;
                        println!("{}", "Started a new conversation.".bright_green());
                        continue;
                    }
                    "/actions" => {
                        let snapshot = controller.snapshot().await;
                        match snapshot.visible_turn() {
                            Some(turn) => print_actions(turn),
                            None => println!(
                                "{}",
                                "No actions available right now.".bright_black()
                            ),
                        }
                        continue;
                    }
                    "/post" => {
                        let snapshot = controller.snapshot().await;
                        match snapshot
                            .turns
                            .iter()
                            .rev()
                            .find_map(|t| t.attached_post.as_ref())
                        {
                            Some(post) => print_post(post),
                            None => println!("{}", "No post draft yet.".bright_black()),
                        }
                        continue;
                    }
                    other if other.starts_with('/') => {
                        println!(
                            "{}",
                            "Unknown command. Type /help for the list.".bright_black()
                        );
                        continue;
                    }
                    _ => {}
                }

                // A bare number picks one of the visible quick actions.
                let outcome = if let Ok(choice) = trimmed.parse::<usize>() {
                    let snapshot = controller.snapshot().await;
                    let picked = snapshot
                        .visible_turn()
                        .and_then(|turn| turn.actions.get(choice.wrapping_sub(1)).cloned());
                    match picked {
                        Some(action) => {
                            println!("{}", format!("> {}", action.label).green());
                            controller.submit_quick_action(&action).await
                        }
                        None => {
                            println!("{}", "No such action right now.".yellow());
                            continue;
                        }
                    }
                } else {
                    println!("{}", format!("> {}", trimmed).green());
                    controller.submit(trimmed).await
                };

                render_outcome(&controller, reveal_delay, outcome).await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
