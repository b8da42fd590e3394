use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use mealplan_cli::{
    add_user, delete_user, export, handle_error, init, list_users, month, open_store, save, show,
    status, today, week, Result,
};
use mealplan_core::{DayMeals, DEFAULT_USER_NAME};

#[derive(Parser)]
#[command(name = "mealplan", version, about = "Records daily meals per user")]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity,

    /// Store to use instead of the one saved by `init`.
    #[arg(long, env = "MEALPLAN_DB", global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the store at PATH and remember it.
    Init {
        /// Path to the store file.
        path: String,
    },
    /// Show the schema of the store without changing it.
    Status,
    /// Manage users.
    #[command(subcommand)]
    Users(UsersCommand),
    /// Show one day.
    Show {
        /// Day to show (YYYY-MM-DD).
        date: NaiveDate,
        #[arg(short, long, default_value = DEFAULT_USER_NAME)]
        user: String,
    },
    /// Save one day. Every field is replaced, omitted ones become empty.
    Save {
        /// Day to save (YYYY-MM-DD).
        date: NaiveDate,
        #[arg(short, long, default_value = DEFAULT_USER_NAME)]
        user: String,
        #[arg(long, default_value = "")]
        breakfast: String,
        #[arg(long, default_value = "")]
        lunch: String,
        #[arg(long, default_value = "")]
        dinner: String,
        #[arg(long, default_value = "")]
        snack: String,
        #[arg(long, default_value = "")]
        memo: String,
    },
    /// Show the week containing DATE, today by default.
    Week {
        date: Option<NaiveDate>,
        #[arg(short, long, default_value = DEFAULT_USER_NAME)]
        user: String,
    },
    /// Show a month calendar, the current month by default.
    Month {
        #[arg(requires = "month")]
        year: Option<i32>,
        month: Option<u32>,
        #[arg(short, long, default_value = DEFAULT_USER_NAME)]
        user: String,
    },
    /// Write a printable sheet of the week containing DATE.
    Export {
        date: Option<NaiveDate>,
        #[arg(short, long, default_value = DEFAULT_USER_NAME)]
        user: String,
        /// Output file. Defaults to a file under `output/`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List all users.
    List,
    /// Register a user.
    Add { name: String },
    /// Delete a user.
    Delete {
        name: String,
        /// Also delete the user's meal records.
        #[arg(long)]
        with_records: bool,
        /// The user's name again, to confirm.
        #[arg(long)]
        confirm: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();
    handle_error(run(cli));
}

fn run(cli: Cli) -> Result<()> {
    let db = cli.db.as_deref();
    match cli.command {
        Commands::Init { path } => init(&path),
        Commands::Status => status(db),
        Commands::Users(cmd) => {
            let conn = open_store(db)?;
            match cmd {
                UsersCommand::List => list_users(&conn),
                UsersCommand::Add { name } => add_user(&conn, &name),
                UsersCommand::Delete {
                    name,
                    with_records,
                    confirm,
                } => delete_user(&conn, &name, with_records, confirm.as_deref()),
            }
        }
        Commands::Show { date, user } => show(&open_store(db)?, &user, date),
        Commands::Save {
            date,
            user,
            breakfast,
            lunch,
            dinner,
            snack,
            memo,
        } => {
            let day = DayMeals {
                breakfast,
                lunch,
                dinner,
                snack,
                memo,
            };
            save(&open_store(db)?, &user, date, &day)
        }
        Commands::Week { date, user } => {
            week(&open_store(db)?, &user, date.unwrap_or_else(today))
        }
        Commands::Month { year, month: m, user } => {
            let now = today();
            let (year, m) = match (year, m) {
                (Some(year), Some(m)) => (year, m),
                _ => (now.year(), now.month()),
            };
            month(&open_store(db)?, &user, year, m)
        }
        Commands::Export { date, user, out } => export(
            &open_store(db)?,
            &user,
            date.unwrap_or_else(today),
            out.as_deref(),
        )
        .map(|_| ()),
    }
}
