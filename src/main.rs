use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use reportbuddy_calendar::{DateRangeMode, ServiceSnapshot};
use reportbuddy_core::{App, AppError, Config};

#[derive(Parser)]
#[command(name = "reportbuddy")]
#[command(about = "Report calendar events matching your keywords and email the summary")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List reportable calendars and whether they are selected
    Calendars,
    /// Show the events that would go into the report
    Events,
    /// Compose the report and open it in the mail client
    Email {
        /// Print the email instead of opening the mail client
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage the keywords events are matched against
    Keywords {
        #[command(subcommand)]
        action: KeywordAction,
    },
    /// Toggle whether a calendar is included in the report
    Select { calendar_id: String },
    /// Only report all-day events
    AllDay { value: Switch },
    /// Report period: "current" or a start and end date (YYYY-MM-DD)
    Range {
        #[arg(num_args = 1..=2, required = true)]
        values: Vec<String>,
    },
    /// Check whether a newer release is available
    CheckUpdate,
}

#[derive(Subcommand)]
enum KeywordAction {
    Add { keyword: String },
    Remove { keyword: String },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, validation) = Config::load_validated()?;
    reportbuddy_core::init(&config)?;
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => exit_with(&e),
    };

    let result = run(&app, cli.command).await;
    app.shutdown();

    if let Err(e) = result {
        exit_with(&e);
    }
    Ok(())
}

fn exit_with(err: &AppError) -> ! {
    tracing::error!("{}", err);
    eprintln!("{}", err.user_message());
    if matches!(err, AppError::Calendar(e) if e.is_recoverable()) {
        eprintln!("Fix the problem above and run the command again.");
    }
    std::process::exit(1);
}

async fn run(app: &App, command: Commands) -> Result<(), AppError> {
    let calendar = app.calendar();

    match command {
        Commands::Calendars => {
            let snapshot = settled(app).await?;
            if snapshot.calendars.is_empty() {
                println!("No calendars found.");
            }
            for cal in &snapshot.calendars {
                let mark = if snapshot.settings.selected_calendar_ids.contains(&cal.id) {
                    "x"
                } else {
                    " "
                };
                println!("[{}] {} ({}) - {}", mark, cal.title, cal.source_title, cal.id);
            }
        }
        Commands::Events => {
            let events = calendar.export().await?;
            for event in &events {
                let kind = if event.all_day { "all day" } else { "timed" };
                println!(
                    "{}  {}  [{}]",
                    event.start.with_timezone(&chrono::Local).format("%Y-%m-%d"),
                    event.title.as_deref().unwrap_or("Untitled"),
                    kind
                );
            }
            println!("Total events: {}", events.len());
        }
        Commands::Email { dry_run } => {
            let email = if dry_run {
                app.compose_report().await?
            } else {
                app.send_report().await?
            };
            println!("To: {}", email.recipients.join(", "));
            println!("Subject: {}", email.subject);
            if dry_run {
                println!();
                println!("{}", email.body);
            }
        }
        Commands::Keywords { action } => {
            match action {
                KeywordAction::Add { keyword } => calendar.add_keyword(keyword)?,
                KeywordAction::Remove { keyword } => calendar.remove_keyword(keyword)?,
                KeywordAction::List => {}
            }
            let snapshot = settled(app).await?;
            for keyword in &snapshot.settings.event_keywords {
                println!("{}", keyword);
            }
        }
        Commands::Select { calendar_id } => {
            calendar.toggle_calendar(calendar_id.clone())?;
            let snapshot = settled(app).await?;
            let selected = snapshot.settings.selected_calendar_ids.contains(&calendar_id);
            println!(
                "{} {}",
                calendar_id,
                if selected { "selected" } else { "deselected" }
            );
        }
        Commands::AllDay { value } => {
            calendar.set_only_all_day(matches!(value, Switch::On))?;
            settled(app).await?;
        }
        Commands::Range { values } => {
            calendar.set_date_range(parse_range(&values)?)?;
            settled(app).await?;
        }
        Commands::CheckUpdate => match app.check_for_updates().await {
            Ok(Some(update)) => {
                println!("Version {} is available: {}", update.version, update.download_url);
                if !update.release_notes.is_empty() {
                    println!();
                    println!("{}", update.release_notes);
                }
            }
            Ok(None) => println!("ReportBuddy {} is up to date.", reportbuddy_core::VERSION),
            Err(e) => {
                tracing::warn!("Update check failed: {}", e);
                eprintln!("{}", e.user_message());
            }
        },
    }

    Ok(())
}

/// Wait for pending work and surface a failed state as an error.
async fn settled(app: &App) -> Result<ServiceSnapshot, AppError> {
    let snapshot = app.calendar().wait_until_settled().await?;
    if let Some(message) = snapshot.state.message() {
        eprintln!("{}", message);
    }
    Ok(snapshot)
}

fn parse_range(values: &[String]) -> Result<DateRangeMode, AppError> {
    match values {
        [mode] if mode == "current" => Ok(DateRangeMode::CurrentMonth),
        [start, end] => {
            let parse = |s: &str| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| anyhow::anyhow!("Invalid date {}: {}", s, e))
            };
            Ok(DateRangeMode::Custom {
                start: parse(start)?,
                end: parse(end)?,
            })
        }
        _ => Err(anyhow::anyhow!("Expected \"current\" or a start and end date").into()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_current_range() {
        assert_eq!(
            parse_range(&args(&["current"])).unwrap(),
            DateRangeMode::CurrentMonth
        );
    }

    #[test]
    fn test_parse_custom_range() {
        let mode = parse_range(&args(&["2025-03-01", "2025-03-31"])).unwrap();
        assert_eq!(
            mode,
            DateRangeMode::Custom {
                start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            }
        );
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        assert!(parse_range(&args(&["march"])).is_err());
        assert!(parse_range(&args(&["2025-03-01", "soon"])).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["reportbuddy", "email", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::Email { dry_run: true }));

        let cli = Cli::try_parse_from(["reportbuddy", "keywords", "add", "lunch"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Keywords {
                action: KeywordAction::Add { .. }
            }
        ));

        let cli = Cli::try_parse_from(["reportbuddy", "all-day", "off"]).unwrap();
        assert!(matches!(cli.command, Commands::AllDay { value: Switch::Off }));
    }
}
