use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    db::SentenceRecord,
    history::HistoryNavigator,
    repository::SeedOutcome,
    App,
};

#[derive(Debug, Parser)]
#[command(name = "hanzi-daily", version, about = "Five Mandarin sentences a day")]
struct Cli {
    /// Directory holding the database and preferences.
    #[arg(long, env = "HANZI_DAILY_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show today's pack, generating it on first use.
    Today,
    /// Generate a new batch for today on top of the existing ones.
    Refresh,
    /// List every sentence stored for a day.
    History {
        /// Day to list, as YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List favorite sentences.
    Favorites,
    /// Toggle the learned flag.
    Learned { id: String },
    /// Toggle the favorite flag.
    Favorite { id: String },
    /// Delete one sentence.
    Delete { id: String },
    /// Step through recent sentences at random.
    Browse,
}

pub(crate) async fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let app = App::open(config)?;
    let cancel = CancellationToken::new();
    let repository = app.repository();

    match cli.command.unwrap_or(Command::Today) {
        Command::Today => {
            match repository.seed_if_empty(&cancel).await? {
                SeedOutcome::Bundled(_) => {
                    println!("(offline: showing the starter sentences)\n");
                }
                SeedOutcome::Generated(_) | SeedOutcome::AlreadySeeded => {}
            }
            print_records(&repository.today_pack().await?);
        }
        Command::Refresh => match app.refresh(&cancel).await {
            Ok(records) => print_records(&records),
            Err(err) => {
                eprintln!("Could not refresh right now: {err}. Try again later.");
            }
        },
        Command::History { date } => {
            let date = date.unwrap_or_else(|| repository.today());
            let pack = repository.daily_pack(date).await?;
            println!("{} ({} sentences, {} learned)\n", pack.date, pack.len(), pack.learned_count());
            print_records(&pack.sentences);
        }
        Command::Favorites => print_records(&repository.favorites().await?),
        Command::Learned { id } => match repository.toggle_learned(&id).await? {
            Some(state) => println!("{id}: learned = {state}"),
            None => println!("{id}: not found"),
        },
        Command::Favorite { id } => match repository.toggle_favorite(&id).await? {
            Some(state) => println!("{id}: favorite = {state}"),
            None => println!("{id}: not found"),
        },
        Command::Delete { id } => {
            let Some(record) = repository.find(&id).await? else {
                bail!("no sentence with id {id}");
            };
            repository.delete(&record).await?;
            println!("deleted {id}");
        }
        Command::Browse => browse(&app).await?,
    }

    Ok(())
}

async fn browse(app: &App) -> Result<()> {
    let mut navigator = app.navigator(None).await?;
    navigator.set_avoid_repeats(true);
    if navigator.pool_len() == 0 {
        println!("No sentences in the last {} days.", app.config().history_window_days);
        return Ok(());
    }

    show(app, navigator.pick_random().cloned());
    print_controls(&navigator);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let shown = match line.trim() {
            "n" => navigator.next().cloned(),
            "p" => navigator.previous().cloned(),
            "r" => navigator.pick_random().cloned(),
            "s" => {
                if let Some(record) = navigator.current() {
                    app.pronouncer().pronounce(record)?;
                }
                continue;
            }
            "q" => break,
            _ => {
                print_controls(&navigator);
                continue;
            }
        };
        show(app, shown);
        print_controls(&navigator);
    }

    Ok(())
}

fn show(app: &App, record: Option<SentenceRecord>) {
    if let Some(record) = record {
        app.mark_viewed(&record);
        print_record(&record);
    }
}

fn print_controls(navigator: &HistoryNavigator) {
    let back = if navigator.can_go_back() { "[p]rev " } else { "" };
    let forward = if navigator.can_go_forward() { "[n]ext " } else { "" };
    println!("{back}{forward}[r]andom [s]peak [q]uit");
}

fn print_records(records: &[SentenceRecord]) {
    if records.is_empty() {
        println!("No sentences.");
    }
    for record in records {
        print_record(record);
    }
}

fn print_record(record: &SentenceRecord) {
    let marks = format!(
        "{}{}",
        if record.favorite { "*" } else { "" },
        if record.learned { "✓" } else { "" }
    );
    println!("{} {marks}\n  {}\n  {}\n  [{}]\n", record.hanzi, record.pinyin, record.english, record.id);
}
