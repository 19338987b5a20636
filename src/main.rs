use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use wellness_tips::WellnessService;
use wellness_tips::config::Config;
use wellness_tips::error::WellnessError;
use wellness_tips::models::{GENDERS, GOALS, ProfileInput, Tip};
use wellness_tips::session::{Applied, EntryFlow, SessionController};
use wellness_tips::store::PersistOutcome;

const HELP: &str = "\
Commands:
  quick <age> <gender> <goal...>   tips from the local catalog
  tips <age> <gender> <goal...>    personalized tips from the model
                                   multi-word fields take commas:
                                   tips 30, non binary, better sleep
  regenerate                       new tips for the current profile
  select <tip-id>                  show a tip's detail
  save <tip-id>                    save or unsave a tip
  saved                            list saved tips
  profile                          show the current profile
  help                             show this message
  quit                             leave";

#[derive(Debug, PartialEq)]
enum Command {
    Submit(EntryFlow, ProfileInput),
    Regenerate,
    Select(String),
    Save(String),
    Saved,
    Profile,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match head.to_lowercase().as_str() {
            "" => Self::Empty,
            "quick" => Self::Submit(EntryFlow::QuickTips, profile_args(rest)),
            "tips" => Self::Submit(EntryFlow::Generated, profile_args(rest)),
            "regenerate" => Self::Regenerate,
            "select" => Self::Select(rest.to_string()),
            "save" => Self::Save(rest.to_string()),
            "saved" => Self::Saved,
            "profile" => Self::Profile,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// `age gender goal...`, or comma separated when a field has spaces.
/// Missing fields stay blank and are caught by profile validation.
fn profile_args(rest: &str) -> ProfileInput {
    let fields: Vec<String> = if rest.contains(',') {
        rest.splitn(3, ',').map(|f| f.trim().to_string()).collect()
    } else {
        let mut words = rest.split_whitespace();
        let age = words.next().unwrap_or_default().to_string();
        let gender = words.next().unwrap_or_default().to_string();
        let goal = words.collect::<Vec<_>>().join(" ");
        vec![age, gender, goal]
    };

    let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
    ProfileInput::new(field(0), field(1), field(2))
}

fn summary(tip: &Tip, saved: bool) -> String {
    let marker = if saved { "★".yellow() } else { " ".normal() };
    format!(
        "{} [{}] {} {} {}",
        marker,
        tip.id.cyan(),
        tip.icon,
        tip.title.bold(),
        format!("({}, {}, {})", tip.category, tip.intensity, tip.duration).dimmed()
    )
}

async fn print_tips(session: &SessionController, tips: &[Tip]) {
    for tip in tips {
        println!("{}", summary(tip, session.is_saved(tip).await));
        println!("      {}", tip.short_desc);
    }
}

fn print_error(e: &WellnessError) {
    if e.is_user_facing() {
        println!("{}", e.to_string().red());
    } else {
        tracing::error!("Unexpected session error: {}", e);
        println!("{}", "Something went wrong, please try again.".red());
    }
}

fn print_help() {
    println!("{HELP}");
    println!("\nGenders: {}", GENDERS.join(", "));
    println!("Goals:   {}", GOALS.join(", "));
}

fn print_stale() {
    println!("{}", "A newer request replaced this result.".dimmed());
}

async fn run_command(session: &Arc<SessionController>, command: Command) -> Result<bool> {
    match command {
        Command::Empty => {}
        Command::Quit => return Ok(false),
        Command::Help => print_help(),
        Command::Unknown(cmd) => println!("Unknown command '{}'. Type 'help'.", cmd.yellow()),
        Command::Submit(flow, input) => match session.submit_profile(&input, flow).await {
            Ok(Applied::Current(tips)) => print_tips(session, &tips).await,
            Ok(Applied::Stale) => print_stale(),
            Err(e) => print_error(&e),
        },
        Command::Regenerate => match session.regenerate().await {
            Ok(Applied::Current(tips)) => print_tips(session, &tips).await,
            Ok(Applied::Stale) => print_stale(),
            Err(e) => print_error(&e),
        },
        Command::Select(id) => {
            let Some(tip) = session.find_tip(&id).await else {
                println!("No tip with id '{}'.", id.yellow());
                return Ok(true);
            };
            match session.select_tip(&tip).await {
                Ok(Applied::Current(detail)) => {
                    println!("{}", serde_json::to_string_pretty(&detail)?)
                }
                Ok(Applied::Stale) => print_stale(),
                Err(e) => print_error(&e),
            }
        }
        Command::Save(id) => {
            let Some(tip) = session.find_tip(&id).await else {
                println!("No tip with id '{}'.", id.yellow());
                return Ok(true);
            };
            let outcome = session.toggle_saved(&tip).await;
            let verb = if outcome.saved { "Saved" } else { "Removed" };
            println!("{} '{}'", verb.green(), tip.title);
            if let PersistOutcome::Failed(reason) = outcome.persisted {
                println!("{}", format!("Not written to storage: {reason}").yellow());
            }
        }
        Command::Saved => {
            let saved = session.saved_tips().await;
            if saved.is_empty() {
                println!("No saved tips yet.");
            }
            for entry in saved {
                println!("{}", summary(&entry.tip, true));
                println!(
                    "      saved {}",
                    entry.saved_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
        Command::Profile => match session.profile().await {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => println!("No profile yet. Try 'quick' or 'tips'."),
        },
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with session output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    tracing::info!("Starting {}", config.app.name);

    let service = WellnessService::new(&config).await?;
    let session = service.session();

    let restored = session.restore().await;
    println!("{}", config.app.name.bold());
    if let Some(profile) = &restored.profile {
        println!(
            "Welcome back: {} year old {} working on {}.",
            profile.age, profile.gender, profile.goal
        );
    }
    if restored.saved > 0 {
        println!("You have {} saved tip(s).", restored.saved);
    }
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !run_command(&session, Command::parse(&line)).await? {
            break;
        }
    }

    tracing::info!("Session ended");
    Ok(())
}
