//! Command-line front end for the planner
//!
//! Drives the planner runtime against the REST API: show a calendar range,
//! add, move, copy, remove or recount entries, and compute position keys.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use planner::core::{position, DayMap};
use planner::services::{LogNotifier, RealScheduleApi};
use planner::{ChangeWindow, DateRange, Intent, Notifier, Outcome, Planner, PlannerConfig, PlannerResult, ScheduleApi};
use shared::{component_debug, logging, parse_day, ComponentId, EntryId, Owner, RecipeId, UserId};

/// Meal-plan calendar client
#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Schedule recipes on a shared meal-plan calendar")]
pub struct Args {
    /// API base URL (overrides PLANNER_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Bearer token (overrides PLANNER_API_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Work on a team calendar instead of the personal one
    #[arg(long)]
    pub team: Option<u64>,

    /// Acting user id (overrides PLANNER_USER_ID)
    #[arg(long)]
    pub user: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute fractional position keys
    Position {
        #[command(subcommand)]
        op: PositionOp,
    },
    /// Print scheduled recipes between two days
    Show {
        #[arg(long, value_parser = day_arg)]
        start: NaiveDate,
        #[arg(long, value_parser = day_arg)]
        end: NaiveDate,
    },
    /// Schedule a recipe
    Add {
        #[arg(long)]
        recipe: u64,
        /// Recipe name shown until the server answers
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, value_parser = day_arg)]
        on: NaiveDate,
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
    },
    /// Move an entry to another day
    Move {
        #[arg(long)]
        id: u64,
        /// Day the entry is currently on
        #[arg(long, value_parser = day_arg)]
        from: NaiveDate,
        #[arg(long, value_parser = day_arg)]
        to: NaiveDate,
        /// Keep the original and schedule a copy
        #[arg(long)]
        copy: bool,
    },
    /// Remove an entry
    Remove {
        #[arg(long)]
        id: u64,
        #[arg(long, value_parser = day_arg)]
        on: NaiveDate,
    },
    /// Change how many times an entry is cooked; 0 removes it
    Count {
        #[arg(long)]
        id: u64,
        #[arg(long, value_parser = day_arg)]
        on: NaiveDate,
        #[arg(long)]
        count: u32,
    },
    /// Print calendar sharing settings
    Settings,
}

#[derive(Subcommand)]
pub enum PositionOp {
    /// Key for the first item of an empty list
    First,
    /// Key sorting before KEY
    Before { key: String },
    /// Key sorting after KEY
    After { key: String },
    /// Key sorting between LOWER and UPPER
    Between { lower: String, upper: String },
}

fn day_arg(input: &str) -> Result<NaiveDate, String> {
    parse_day(input).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    ComponentId::init_cli();

    let mut config = PlannerConfig::from_env()?;
    if let Some(url) = args.api_url.clone() {
        config.api_url = url;
    }
    if let Some(token) = args.token.clone() {
        config.api_token = Some(token);
    }
    if let Some(level) = args.log_level.clone() {
        config.log_level = level;
    }

    logging::init_tracing_with_level(Some(&config.log_level));
    logging::log_startup(ComponentId::current(), "planner cli");
    component_debug!(ComponentId::current(), "Using API at {}", config.api_url);

    if let Commands::Position { op } = &args.command {
        println!("{}", run_position(op)?);
        logging::log_shutdown(ComponentId::current(), "done");
        return Ok(());
    }

    let Some(user) = args.user.or(config.user_id) else {
        bail!("no acting user: pass --user or set PLANNER_USER_ID");
    };

    let owner = match args.team {
        Some(team_id) => Owner::team(team_id),
        None => Owner::Personal,
    };

    let api = RealScheduleApi::from_config(&config)?;
    let mut planner = Planner::new(
        api,
        LogNotifier,
        UserId(user),
        ChangeWindow::new(config.change_window_days),
    );

    match args.command {
        Commands::Position { .. } => {}
        Commands::Show { start, end } => {
            let range = DateRange::new(owner, start, end);
            planner.load_range(range).await.context("failed to load calendar")?;
            print_days(&planner.schedule(&range));
        }
        Commands::Add { recipe, name, on, count } => {
            let intent = Intent::Create {
                recipe_id: RecipeId(recipe),
                recipe_name: if name.is_empty() { format!("recipe {recipe}") } else { name },
                owner,
                on,
                count,
            };
            apply(&mut planner, intent, DateRange::new(owner, on, on)).await?;
        }
        Commands::Move { id, from, to, copy } => {
            let range = DateRange::new(owner, from, to);
            planner.load_range(range).await.context("failed to load calendar")?;
            let intent = Intent::Move {
                id: EntryId::Confirmed(id),
                to,
                duplicate: copy,
            };
            apply(&mut planner, intent, range).await?;
        }
        Commands::Remove { id, on } => {
            let range = DateRange::new(owner, on, on);
            planner.load_range(range).await.context("failed to load calendar")?;
            apply(&mut planner, Intent::Delete { id: EntryId::Confirmed(id) }, range).await?;
        }
        Commands::Count { id, on, count } => {
            let range = DateRange::new(owner, on, on);
            planner.load_range(range).await.context("failed to load calendar")?;
            let intent = Intent::ChangeCount {
                id: EntryId::Confirmed(id),
                count,
            };
            apply(&mut planner, intent, range).await?;
        }
        Commands::Settings => {
            let settings = planner.load_settings(owner).await.context("failed to load settings")?;
            println!("sync enabled: {}", settings.sync_enabled);
            println!("calendar link: {}", settings.calendar_link.as_deref().unwrap_or("-"));
        }
    }

    logging::log_shutdown(ComponentId::current(), "done");
    Ok(())
}

fn run_position(op: &PositionOp) -> PlannerResult<String> {
    match op {
        PositionOp::First => Ok(position::first_position()),
        PositionOp::Before { key } => position::position_before(key),
        PositionOp::After { key } => position::position_after(key),
        PositionOp::Between { lower, upper } => position::position_between(lower, upper),
    }
}

/// Dispatch one intent, wait for the server, and print the affected days
async fn apply<A, N>(planner: &mut Planner<A, N>, intent: Intent, range: DateRange) -> anyhow::Result<()>
where
    A: ScheduleApi + 'static,
    N: Notifier + 'static,
{
    let Some(handle) = planner.dispatch(intent).await? else {
        bail!("entry not found in {} between {} and {}", range.owner, range.start, range.end);
    };
    planner.settle().await;

    let notice = handle.finished().await.context("action was dropped")?;
    if let Outcome::Failed { reason } = notice.outcome {
        bail!("{} failed: {}", notice.kind, reason);
    }

    print_days(&planner.schedule(&range));
    Ok(())
}

fn print_days(days: &DayMap) {
    if days.is_empty() {
        println!("(nothing scheduled)");
        return;
    }
    for (day, entries) in days {
        println!("{day}");
        for entry in entries {
            println!("  [{}] {} x{}", entry.id, entry.recipe_name, entry.count);
        }
    }
}
