//! site: command-line front end for the content-site idle game.
//!
//! Usage:
//!   site create-site --save-slot main --difficulty 1.5
//!   site buy --clear-after 2 advertisement --power 250
//!   site check stats
//!
//! Every command that touches a slot runs the same cycle: pick the slot,
//! load it, catch it up with `update()`, run the command, save once.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sitesim_core::{
    command::{apply_command, AdPower, ClearAt, CommandOutcome, Expiry, PlayerCommand},
    slot::{SlotStats, DEFAULT_DAY_LENGTH},
    store::{SlotChoice, SlotStore},
    SaveSlot, SessionState, SimError,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "site", author, version, about = "Grow a content site, one day at a time", long_about = None)]
struct Cli {
    /// Directory holding the save slots.
    #[arg(long, global = true, default_value = "saves")]
    saves_dir: PathBuf,

    /// Use this save slot instead of the selected one.
    #[arg(long, global = true)]
    save_slot: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Settings threaded through one invocation. The current-slot pointer is
/// read once, when the slot is picked.
struct RunnerConfig {
    saves_dir: PathBuf,
    save_slot: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new game: create a new site.
    CreateSite {
        #[arg(short, long, default_value = "1")]
        difficulty: Decimal,
        /// Seconds per in-game day.
        #[arg(short = 't', long, default_value_t = DEFAULT_DAY_LENGTH)]
        day_length: u64,
        /// Overwrite an existing slot without asking.
        #[arg(short, long)]
        force: bool,
        /// Never prompt; fail instead of asking.
        #[arg(short = 'I', long)]
        non_interactive: bool,
    },
    /// Select the save slot used by later commands.
    SelectSlot {
        slot: String,
        /// Select the slot even if it does not exist yet.
        #[arg(short, long)]
        force: bool,
        /// Never prompt; fail instead of asking.
        #[arg(short = 'I', long)]
        non_interactive: bool,
    },
    /// Look at the site.
    Check {
        #[command(subcommand)]
        what: CheckCommand,
    },
    /// Buy a boost. The purchase clears after a delay.
    Buy {
        #[command(flatten)]
        clear: ClearArgs,
        /// Print the price without buying.
        #[arg(short, long)]
        quote: bool,
        #[command(subcommand)]
        item: BuyCommand,
    },
    /// Promote the site yourself.
    Promo {
        #[command(subcommand)]
        what: PromoCommand,
    },
    /// Change a setting.
    Set {
        #[command(subcommand)]
        what: SetCommand,
    },
    /// Cancel pending items.
    Cancel {
        #[command(subcommand)]
        what: CancelCommand,
    },
}

#[derive(Args)]
struct ClearArgs {
    /// Clear this many days from today.
    #[arg(short = 'c', long, conflicts_with = "clear_on")]
    clear_after: Option<u64>,
    /// Clear on this day number.
    #[arg(short = 'o', long)]
    clear_on: Option<u64>,
}

impl ClearArgs {
    fn to_clear_at(&self) -> ClearAt {
        match (self.clear_on, self.clear_after) {
            (Some(day), _)     => ClearAt::OnDay(day),
            (None, Some(days)) => ClearAt::AfterDays(days),
            (None, None)       => ClearAt::default(),
        }
    }
}

#[derive(Subcommand)]
enum CheckCommand {
    /// Current statistics.
    Stats {
        /// Print only these values: today, views, cumulative, money, boosts,
        /// pending, cdn, friends, promos, difficulty, day, ctime, mtime, all.
        #[arg(short = 'n', long, num_args = 1..)]
        stats: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Daily view history, most recent first.
    Views {
        /// Number of days to show; 0 shows all.
        #[arg(short, long, default_value_t = 1)]
        table: usize,
        #[arg(long)]
        csv: bool,
    },
}

#[derive(Subcommand)]
enum BuyCommand {
    Advertisement {
        /// Run for this many days.
        #[arg(short, long, conflicts_with = "until")]
        expires: Option<u64>,
        /// Run until this day number.
        #[arg(short = 't', long)]
        until: Option<u64>,
        /// Views per day.
        #[arg(short, long, conflicts_with = "fraction", allow_negative_numbers = true)]
        power: Option<i64>,
        /// Views per day as a multiple of today's views.
        #[arg(short, long, allow_negative_numbers = true)]
        fraction: Option<f64>,
    },
    Cdn {
        #[arg(allow_negative_numbers = true)]
        latitude: i32,
        #[arg(allow_negative_numbers = true)]
        longitude: i32,
    },
}

#[derive(Subcommand)]
enum PromoCommand {
    /// Ping friends; without a count, show how many are left.
    Friends {
        #[arg(allow_negative_numbers = true)]
        count: Option<i64>,
    },
    /// Promote on other channels; without a count, show how many are left.
    Channels {
        #[arg(allow_negative_numbers = true)]
        count: Option<i64>,
    },
}

#[derive(Subcommand)]
enum SetCommand {
    /// Fraction of views traded for ad revenue, 0 to 1.
    Ads {
        #[arg(allow_negative_numbers = true)]
        proportion: Option<Decimal>,
    },
    Difficulty {
        #[arg(allow_negative_numbers = true)]
        multiplier: Option<Decimal>,
    },
}

#[derive(Subcommand)]
enum CancelCommand {
    /// Cancel pending transactions by their 1-based index.
    Transaction {
        #[arg(required = true)]
        indexes: Vec<usize>,
    },
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let config = RunnerConfig { saves_dir: cli.saves_dir, save_slot: cli.save_slot };
    let store = SlotStore::open(&config.saves_dir)
        .with_context(|| format!("cannot open saves directory {}", config.saves_dir.display()))?;

    match cli.command {
        Command::CreateSite { difficulty, day_length, force, non_interactive } => {
            create_site(&store, &config, difficulty, day_length, force, !non_interactive)
        }
        Command::SelectSlot { slot, force, non_interactive } => {
            select_slot(&store, &slot, force, !non_interactive)
        }
        command => run_on_slot(&store, &config, command),
    }
}

fn create_site(
    store: &SlotStore,
    config: &RunnerConfig,
    difficulty: Decimal,
    day_length: u64,
    force: bool,
    interactive: bool,
) -> Result<ExitCode> {
    let name = match &config.save_slot {
        Some(name) => name.clone(),
        None if !interactive => return Ok(ExitCode::FAILURE),
        None => loop {
            let answer = prompt("Save slot name: ")?;
            if !answer.is_empty() {
                break answer;
            }
        },
    };
    if store.exists(&name) && !force {
        if !interactive || !confirm(&format!("Slot '{name}' exists. Overwrite? [y/N] "))? {
            return Ok(ExitCode::FAILURE);
        }
    }
    let slot = match SaveSlot::new(difficulty, day_length, now()) {
        Ok(slot) => slot,
        Err(e) => return usage_error(e),
    };
    store.save(&name, &slot)?;
    if !interactive {
        return Ok(ExitCode::SUCCESS);
    }
    println!(
        "Created a site in slot '{name}' (difficulty {}, {}s days)",
        slot.difficulty_multiplier, slot.day_length
    );
    Ok(ExitCode::SUCCESS)
}

fn select_slot(store: &SlotStore, name: &str, force: bool, interactive: bool) -> Result<ExitCode> {
    if !store.exists(name) && !force {
        if !interactive || !confirm(&format!("Slot '{name}' does not exist. Create it? [y/N] "))? {
            return Ok(ExitCode::FAILURE);
        }
    }
    store.set_current(name)?;
    Ok(ExitCode::SUCCESS)
}

fn run_on_slot(store: &SlotStore, config: &RunnerConfig, command: Command) -> Result<ExitCode> {
    let name = pick_slot(store, config.save_slot.as_deref())?;
    let mut slot = store
        .load_or_create(&name, now())
        .with_context(|| format!("cannot load save slot '{name}'"))?;

    let outcome = slot.update().with_context(|| format!("cannot update save slot '{name}'"))?;
    log::debug!("Replayed {} day(s)", outcome.days_advanced);
    for warning in &outcome.warnings {
        println!(
            "warning: transaction {} cannot be afforded yet: {}",
            warning.position, warning.description
        );
    }

    if outcome.state == SessionState::WonPendingDecision {
        let accept = confirm("Your site has been seen by everyone on Earth! Keep going? [y/N] ")?;
        if slot.resolve_win(accept) == SessionState::Ended {
            store.save(&name, &slot)?;
            store.clear_current()?;
            println!("Thanks for playing!");
            return Ok(ExitCode::FAILURE);
        }
    }

    let result = run_command(&mut slot, command);
    store.save(&name, &slot)?;
    result
}

fn run_command(slot: &mut SaveSlot, command: Command) -> Result<ExitCode> {
    let player_command = match command {
        Command::Check { what: CheckCommand::Stats { stats, json } } => {
            print_stats(&slot.stats(), &stats, json)?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Check { what: CheckCommand::Views { table, csv } } => {
            print_views(slot, table, csv);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Buy { clear, quote, item } => match item {
            BuyCommand::Advertisement { expires, until, power, fraction } => {
                PlayerCommand::BuyAdvertisement {
                    clear: clear.to_clear_at(),
                    expiry: match (until, expires) {
                        (Some(day), _)     => Expiry::UntilDay(day),
                        (None, Some(days)) => Expiry::InDays(days),
                        (None, None)       => Expiry::default(),
                    },
                    power: match (fraction, power) {
                        (Some(f), _)          => AdPower::FractionOfToday(f),
                        (None, Some(views))   => AdPower::Fixed(views),
                        (None, None)          => AdPower::default(),
                    },
                    quote,
                }
            }
            BuyCommand::Cdn { latitude, longitude } => PlayerCommand::BuyCdn {
                clear: clear.to_clear_at(),
                latitude,
                longitude,
                quote,
            },
        },
        Command::Promo { what: PromoCommand::Friends { count } } => PlayerCommand::PromoFriends { count },
        Command::Promo { what: PromoCommand::Channels { count } } => PlayerCommand::PromoChannels { count },
        Command::Set { what: SetCommand::Ads { proportion } } => PlayerCommand::SetAds { proportion },
        Command::Set { what: SetCommand::Difficulty { multiplier } } => {
            PlayerCommand::SetDifficulty { multiplier }
        }
        Command::Cancel { what: CancelCommand::Transaction { indexes } } => {
            PlayerCommand::CancelTransactions { indexes }
        }
        Command::CreateSite { .. } | Command::SelectSlot { .. } => {
            anyhow::bail!("command does not operate on a loaded slot")
        }
    };

    match apply_command(slot, player_command) {
        Ok(CommandOutcome::Queued { position }) => println!("Queued as transaction {position}"),
        Ok(CommandOutcome::Quote(text) | CommandOutcome::Report(text)) => println!("{text}"),
        Ok(CommandOutcome::Applied) => {}
        Ok(CommandOutcome::Cancelled { removed }) => println!("Cancelled {removed} transaction(s)"),
        Err(e @ SimError::InvalidCommand(_)) => return usage_error(e),
        Err(e) => return Err(e.into()),
    }
    Ok(ExitCode::SUCCESS)
}

fn pick_slot(store: &SlotStore, explicit: Option<&str>) -> Result<String> {
    let name = match store.resolve(explicit)? {
        SlotChoice::Explicit(name) | SlotChoice::Current(name) => return Ok(name),
        SlotChoice::OnlySlot(name) => {
            println!("Using the only save slot, '{name}'");
            name
        }
        SlotChoice::Fresh(name) => {
            println!("No save slots yet; starting slot '{name}'");
            name
        }
        SlotChoice::Ambiguous(names) => {
            println!("Several save slots exist:");
            println!("{}", names.join("\n"));
            loop {
                let answer = prompt("Save slot name: ")?;
                if names.contains(&answer) {
                    break answer;
                }
            }
        }
    };
    store.set_current(&name)?;
    Ok(name)
}

fn print_stats(stats: &SlotStats, keys: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }
    let rows = stat_rows(stats);
    if keys.is_empty() {
        for (key, value) in &rows {
            println!("{key:<12}{value}");
        }
        return Ok(());
    }
    if keys.iter().any(|k| k == "all") {
        for (_, value) in &rows {
            println!("{value}");
        }
        return Ok(());
    }
    for key in keys {
        match rows.iter().find(|(k, _)| k == key) {
            Some((_, value)) => println!("{value}"),
            None => log::warn!("Unknown stat '{key}'"),
        }
    }
    Ok(())
}

fn stat_rows(stats: &SlotStats) -> Vec<(&'static str, String)> {
    vec![
        ("today",      stats.today.to_string()),
        ("views",      stats.views.to_string()),
        ("cumulative", stats.cumulative.to_string()),
        ("money",      stats.money.round_dp(2).to_string()),
        ("boosts",     stats.boosts.to_string()),
        ("pending",    stats.pending.to_string()),
        ("cdn",        stats.cdn.to_string()),
        ("friends",    stats.friends.clone()),
        ("promos",     stats.promos.clone()),
        ("difficulty", stats.difficulty.to_string()),
        ("day",        stats.day_length.to_string()),
        ("ctime",      stats.ctime.clone()),
        ("mtime",      stats.mtime.clone()),
    ]
}

fn print_views(slot: &SaveSlot, table: usize, csv: bool) {
    let sep = if csv { "," } else { "\t" };
    let header = ["Day", "Views", "Cumulative"].join(sep);
    println!("{header}");
    if !csv {
        println!("{}", "-".repeat(16 + "Cumulative".len()));
    }
    let limit = if table == 0 { slot.views.len() } else { table };
    for (index, (views, cumulative)) in slot.views.iter().enumerate().rev().take(limit) {
        // views[0] is day 1
        println!("{}{sep}{views}{sep}{cumulative}", index + 1);
    }
}

fn usage_error(e: SimError) -> Result<ExitCode> {
    eprintln!("site: error: {e}");
    Ok(ExitCode::from(2))
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        anyhow::bail!("no input");
    }
    Ok(line.trim().to_string())
}

/// Yes when the first character of the answer is `y` or `Y`.
fn confirm(message: &str) -> Result<bool> {
    let answer = prompt(message)?;
    Ok(answer.chars().next().is_some_and(|c| c.eq_ignore_ascii_case(&'y')))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
