use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use billed::commands;
use billed::commands::settings::SettingsPayload;
use billed::db::Database;
use billed::models::{BillDraft, ExpenseType, Settings};
use billed::services::http_gateway::HttpBillGateway;
use billed::services::navigation::Route;
use billed::services::presenter::BillsView;
use billed::services::state::AppState;
use billed::services::submission::SubmissionState;
use billed::utils::{normalize_date, parse_decimal};

#[derive(Parser)]
#[command(name = "billed", version, about = "List and submit expense bills")]
struct Cli {
    /// Directory holding the local settings database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Check that the backend answers
    Ping,
    /// List my bills, most recent first
    List,
    /// Show the receipt of a bill
    Show {
        id: String,
        /// Open the receipt with the system viewer
        #[arg(long)]
        open: bool,
        #[arg(long, default_value_t = 800)]
        modal_width: u32,
    },
    /// Submit a new bill
    Submit(SubmitArgs),
    /// Local log of past submissions
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set {
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long)]
        api_token: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    Show,
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long = "type")]
    expense_type: ExpenseType,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, value_parser = parse_amount)]
    amount: f64,
    /// YYYY-MM-DD (DD/MM/YYYY is accepted too)
    #[arg(long)]
    date: String,
    #[arg(long, default_value = "")]
    vat: String,
    #[arg(long)]
    pct: Option<u8>,
    #[arg(long, default_value = "")]
    commentary: String,
    /// Receipt image (jpg, jpeg or png)
    #[arg(long)]
    file: Option<PathBuf>,
}

impl SubmitArgs {
    fn to_draft(&self) -> BillDraft {
        BillDraft {
            expense_type: self.expense_type,
            name: self.name.clone(),
            amount: self.amount,
            date: normalize_date(&self.date),
            vat: self.vat.clone(),
            pct: self.pct,
            commentary: self.commentary.clone(),
        }
    }
}

fn parse_amount(value: &str) -> Result<f64, String> {
    parse_decimal(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Erreur: {:#}", err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_database(data_dir: Option<PathBuf>) -> Result<Database> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?
            .join("billed"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(Database::new(dir.join("billed.sqlite"))?)
}

fn build_state(db: Database) -> Result<AppState> {
    let settings = commands::settings::load_settings(&db)?;
    let gateway = HttpBillGateway::from_settings(&settings)?;
    Ok(AppState::new(db, settings, Arc::new(gateway)))
}

async fn run(cli: Cli) -> Result<()> {
    let db = open_database(cli.data_dir)?;

    match cli.command {
        Command::Config { action } => config(&db, action),
        Command::History { limit } => {
            for log in commands::settings::get_history(&db, limit)? {
                println!(
                    "{}  {:<10} {:<10} {:<22} {}",
                    log.created_at,
                    log.stage,
                    log.status,
                    log.bill_id.unwrap_or_default(),
                    log.message.unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::Ping => {
            let state = build_state(db)?;
            match commands::settings::test_connection(state.gateway()).await {
                Ok(count) => {
                    println!("OK ({} bills)", count);
                    Ok(())
                }
                Err(err) => Err(anyhow!("{} error: {}", err.kind, err.message)),
            }
        }
        Command::List => {
            let state = build_state(db)?;
            let view = commands::bills::get_bills(&state).await?;
            print_bills(&view)
        }
        Command::Show {
            id,
            open,
            modal_width,
        } => {
            let state = build_state(db)?;
            if let BillsView::Error { message } = commands::bills::get_bills(&state).await? {
                return Err(anyhow!(message));
            }
            let preview = commands::bills::handle_click_icon_eye(&state, &id, modal_width)?;
            println!("{}  {} ({}px)", preview.file_name, preview.file_url, preview.width);
            if open {
                commands::bills::open_receipt(&preview)?;
            }
            Ok(())
        }
        Command::Submit(args) => submit(db, args).await,
    }
}

fn config(db: &Database, action: ConfigAction) -> Result<()> {
    let settings = match action {
        ConfigAction::Set {
            api_url,
            api_token,
            email,
            timeout_secs,
        } => commands::settings::save_settings(
            db,
            &SettingsPayload {
                api_url,
                api_token,
                email,
                timeout_secs,
            },
        )?,
        ConfigAction::Show => commands::settings::load_settings(db)?,
    };
    print_settings(&settings);
    Ok(())
}

async fn submit(db: Database, args: SubmitArgs) -> Result<()> {
    let state = build_state(db)?;
    let mut workflow = state.new_submission()?;
    if let Some(path) = &args.file {
        commands::new_bill::handle_change_file(&mut workflow, path).await?;
    }

    let navigated = Cell::new(None);
    let navigator = |route: Route| navigated.set(Some(route));
    let outcome = commands::new_bill::handle_submit(&state, &mut workflow, &args.to_draft(), &navigator).await?;

    match outcome {
        SubmissionState::Submitted { bill } => {
            println!("Bill submitted: {}", bill.id.unwrap_or_default());
        }
        SubmissionState::Failed { stage, kind, message } => {
            let hint = if kind.is_retryable() { " (retry possible)" } else { "" };
            return Err(anyhow!("{} failed: {}{}", stage, message, hint));
        }
        other => return Err(anyhow!("Submission ended in {:?}", other)),
    }

    if navigated.get() == Some(Route::Bills) {
        let view = commands::bills::get_bills(&state).await?;
        print_bills(&view)?;
    }
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("api_url      {}", settings.api_url.as_deref().unwrap_or("-"));
    println!(
        "api_token    {}",
        commands::settings::masked_token(settings).unwrap_or_else(|| "-".to_string())
    );
    println!("email        {}", settings.email.as_deref().unwrap_or("-"));
    println!("timeout_secs {}", settings.timeout_secs);
}

fn print_bills(view: &BillsView) -> Result<()> {
    match view {
        BillsView::Loading => println!("Loading..."),
        BillsView::Error { message } => return Err(anyhow!(message.clone())),
        BillsView::Bills { rows } if rows.is_empty() => println!("Aucune note de frais"),
        BillsView::Bills { rows } => {
            println!("Mes notes de frais");
            for row in rows {
                println!(
                    "{:<11} {:<24} {:<24} {:>10}  {:<11} {}{}",
                    row.display_date,
                    row.expense_type,
                    row.name,
                    row.amount,
                    row.status,
                    row.id.as_deref().unwrap_or("-"),
                    if row.file_url.is_some() { "  [justificatif]" } else { "" }
                );
            }
        }
    }
    Ok(())
}
