//! Bybit Risk Analyzer - Main Entry Point

use anyhow::{Context, Result};
use bybit_risk_analyzer::advisor::Advisor;
use bybit_risk_analyzer::analysis::analyze_positions;
use bybit_risk_analyzer::config::Config;
use bybit_risk_analyzer::exchange::{AccountDataProvider, BybitClient};
use bybit_risk_analyzer::server::{self, AppState};
use bybit_risk_analyzer::{report, telegram};
use clap::{CommandFactory, Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Bybit Risk Analyzer CLI
#[derive(Parser)]
#[command(name = "bybit-risk-analyzer")]
#[command(version, about = "Position and portfolio risk analysis for Bybit")]
struct Cli {
    /// Config file basename (extension optional)
    #[arg(short, long, global = true, default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze current positions and print a risk report
    Analyze,

    /// List open positions
    List,

    /// List open orders
    Orders,

    /// Serve the dashboard and JSON API
    Serve {
        /// Socket address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run the Telegram bot with order notifications
    Bot,
}

impl Commands {
    /// Report commands keep the terminal clean and log to file only.
    fn logs_to_stdout(&self) -> bool {
        matches!(self, Commands::Serve { .. } | Commands::Bot)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // No subcommand is a usage error.
        let _ = Cli::command().print_help();
        eprintln!();
        return ExitCode::FAILURE;
    };

    if let Err(e) = init_logging(command.logs_to_stdout()) {
        eprintln!("⚠️  Failed to initialize logging: {:#}", e);
    }

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            println!("\n❌ Configuration Error: {:#}", e);
            print_config_help();
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        Commands::Analyze => analyze_command(&config).await,
        Commands::List => list_command(&config).await,
        Commands::Orders => orders_command(&config).await,
        Commands::Serve { bind } => serve_command(config, bind).await,
        Commands::Bot => bot_command(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:#}", e);
            println!("\n❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &str) -> Result<Config> {
    let config = Config::load_from(path)?;
    config.validate()?;
    Ok(config)
}

fn print_config_help() {
    println!("\nPlease set the following environment variables:");
    println!("  - BYBIT_API_KEY");
    println!("  - BYBIT_API_SECRET");
    println!("\nOptional:");
    println!("  - OPENAI_API_KEY or ANTHROPIC_API_KEY  (AI suggestions)");
    println!("  - TELEGRAM_BOT_TOKEN                   (bot command)");
    println!("\nExample:");
    println!("  export BYBIT_API_KEY='your_key_here'");
    println!("  export BYBIT_API_SECRET='your_secret_here'");
}

fn account_provider(config: &Config) -> Result<Arc<dyn AccountDataProvider>> {
    let client = BybitClient::new(&config.bybit)?;
    Ok(Arc::new(client))
}

/// Provider for long-running services; a failed credential check is logged, not fatal.
async fn checked_account_provider(config: &Config) -> Result<Arc<dyn AccountDataProvider>> {
    let client = BybitClient::new(&config.bybit)?;

    if client.test_connection().await {
        info!("✅ Bybit credentials verified");
    } else {
        warn!("⚠️  Bybit connection check failed, account requests will report errors");
    }

    Ok(Arc::new(client))
}

/// Fetch positions and orders, analyze them and print the full report.
async fn analyze_command(config: &Config) -> Result<()> {
    println!("🤖 Bybit Position Analysis Bot");
    println!("{}", "=".repeat(60));

    let advisor = Advisor::new(&config.ai)?;
    match advisor.provider() {
        Some(p) => println!("✅ {} API configured - AI analysis enabled", p),
        None => println!("ℹ️  No AI provider configured - using rule-based analysis"),
    }

    let provider = account_provider(config)?;

    println!("\n📡 Fetching positions from Bybit...");
    let positions = provider.get_positions().await?;
    println!("✅ Found {} open position(s)", positions.len());

    if positions.is_empty() {
        println!("\n✨ No open positions to analyze!");
        return Ok(());
    }

    let orders = provider.get_open_orders().await?;

    println!("🔍 Analyzing positions...");
    let analysis = analyze_positions(&positions, &orders);
    info!(
        positions = analysis.positions.len(),
        orders = analysis.orders.len(),
        "Analysis computed"
    );

    println!("🧠 Generating suggestions...");
    let suggestions = advisor.suggest(&analysis).await;

    print!("{}", report::analysis_report(&analysis, &suggestions));
    Ok(())
}

async fn list_command(config: &Config) -> Result<()> {
    let provider = account_provider(config)?;

    println!("📡 Fetching positions from Bybit...");
    let positions = provider.get_positions().await?;
    print!("{}", report::positions_list(&positions));
    Ok(())
}

async fn orders_command(config: &Config) -> Result<()> {
    let provider = account_provider(config)?;

    println!("📡 Fetching orders from Bybit...");
    let orders = provider.get_open_orders().await?;
    print!("{}", report::orders_list(&orders));
    Ok(())
}

async fn serve_command(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    log_config(&config);

    let provider = checked_account_provider(&config).await?;
    let state = AppState::new(provider, Advisor::new(&config.ai)?);
    server::serve(&config.server, state).await
}

async fn bot_command(config: &Config) -> Result<()> {
    log_config(config);

    let advisor = Advisor::new(&config.ai)?;
    let provider = checked_account_provider(config).await?;
    telegram::run_bot(config, provider, advisor)
        .await
        .context("Telegram bot failed")
}

/// Initialize logging; the file log is always on, stdout only when asked.
fn init_logging(stdout: bool) -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "risk-analyzer.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the whole program.
    Box::leak(Box::new(guard));

    let filter = EnvFilter::from_default_env()
        .add_directive("bybit_risk_analyzer=debug".parse()?)
        .add_directive(Level::INFO.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE);

    if stdout {
        builder
            .with_writer(std::io::stdout.and(file_writer))
            .with_ansi(true)
            .init();
    } else {
        builder.with_writer(file_writer).with_ansi(false).init();
    }

    Ok(())
}

/// Log configuration on startup, secrets redacted.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Bybit API: {}", config.bybit.base_url);
    info!("   Order stream: {}", config.bybit.ws_url);
    info!(
        "   Category: {} / {}",
        config.bybit.category, config.bybit.settle_coin
    );
    info!(
        "   AI provider: {}",
        config
            .ai_provider()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "rule-based".to_string())
    );
    info!("   Dashboard: {}", config.server.bind_addr);
    info!(
        "   Telegram: {}",
        if config.telegram.bot_token.is_empty() {
            "not configured"
        } else {
            "configured"
        }
    );
}
