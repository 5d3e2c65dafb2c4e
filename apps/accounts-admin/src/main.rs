use std::path::PathBuf;
use std::process::ExitCode;

use accounts::config::AccountsConfig;
use accounts::contract::model::{GroupDeletion, ProvisionReport};
use accounts::Accounts;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit_db::{build_db_handle, DbHandle};
use runtime::{AppConfig, CliArgs};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Account maintenance: profile provisioning and group eradication
#[derive(Parser)]
#[command(name = "accounts-admin")]
#[command(about = "Account maintenance: profile provisioning and group eradication")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database DSN (overrides the `database` section)
    #[arg(long, value_name = "DSN")]
    database_url: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Apply schema migrations before running the command
    #[arg(long)]
    migrate: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default profile for every user that has none
    ReconcileProfiles {
        /// Compute the report but roll everything back
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete a group and all of its memberships
    DeleteGroup {
        /// Exact (case-sensitive) group name
        #[arg(long)]
        name: String,
        /// Compute the summary but roll everything back
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply schema migrations and exit
    Migrate,
    /// Check configuration and store connectivity
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "accounts-admin failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // CLI args passed down to config
    let args = CliArgs {
        database_url: cli.database_url.clone(),
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    // Initialize logging
    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, &config.home_dir());
    tracing::info!("accounts-admin starting");

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let command = cli
        .command
        .ok_or_else(|| anyhow!("no command given (see --help)"))?;

    let mut accounts_cfg: AccountsConfig = config.module_config("accounts")?;
    accounts_cfg.auto_migrate |= cli.migrate;

    match command {
        Commands::Check => check_config(&config).await,
        Commands::Migrate => {
            let db = open_store(&config).await?;
            accounts::module::migrate(&db).await?;
            println!("migrations applied");
            db.close().await?;
            Ok(())
        }
        Commands::ReconcileProfiles { dry_run } => {
            accounts_cfg.dry_run |= dry_run;
            let db = open_store(&config).await?;
            let module = Accounts::init(&db, &accounts_cfg).await?;
            let report = module.client().reconcile_profiles().await?;
            println!("{}", describe_report(&report));
            db.close().await?;
            Ok(())
        }
        Commands::DeleteGroup { name, dry_run } => {
            accounts_cfg.dry_run |= dry_run;
            let db = open_store(&config).await?;
            let module = Accounts::init(&db, &accounts_cfg).await?;
            let deletion = module.client().delete_group_by_name(&name).await?;
            println!("{}", describe_deletion(&deletion));
            db.close().await?;
            Ok(())
        }
    }
}

async fn open_store(config: &AppConfig) -> Result<DbHandle> {
    let db_cfg = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("database is not configured"))?;
    let db = build_db_handle(db_cfg, &config.home_dir())
        .await
        .context("failed to open the account store")?;
    tracing::info!(engine = ?db.engine(), dsn = %db.dsn(), "Connected to account store");
    Ok(db)
}

async fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let db = open_store(config).await?;
    db.ping().await.context("account store is not reachable")?;
    db.close().await?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "dry run: "
    } else {
        ""
    }
}

fn describe_report(report: &ProvisionReport) -> String {
    let mut line = format!(
        "{}provisioned {} profile(s): {:?}",
        dry_run_prefix(report.dry_run),
        report.provisioned.len(),
        report.provisioned
    );
    if !report.already_existed.is_empty() {
        line.push_str(&format!(
            "; {} already existed: {:?}",
            report.already_existed.len(),
            report.already_existed
        ));
    }
    line
}

fn describe_deletion(deletion: &GroupDeletion) -> String {
    match deletion {
        GroupDeletion::NotFound { name } => format!("group '{name}' not found; nothing to delete"),
        GroupDeletion::Deleted(s) => format!(
            "{}deleted group '{}' (id={}) and {} membership(s)",
            dry_run_prefix(s.dry_run),
            s.group_name,
            s.group_id,
            s.members_deleted
        ),
    }
}
