use anyhow::Context;
use clap::{Parser, Subcommand};
use formdriver::scenario::{load_records, DataRecord, ExecutionReport, Scenario, ScenarioRunner};
use formdriver::{init_logging, ActionExecutor, ChromeDriver, DriverConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario in Chrome, once per data record
    Run {
        /// Scenario JSON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// JSON array of data records
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Driver configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Path to the Chrome executable
        #[arg(long, env = "CHROME_PATH")]
        chrome_path: Option<String>,

        /// Disable the Chrome sandbox (needed in some containers)
        #[arg(long)]
        no_sandbox: bool,

        /// Attach to a Chrome already listening on this debug port
        #[arg(long, conflicts_with_all = ["headed", "chrome_path", "no_sandbox"])]
        debug_port: Option<u16>,
    },
    /// Check a scenario file without opening a browser
    Validate {
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();

    let result = match args.command {
        Command::Run {
            scenario,
            data,
            config,
            headed,
            chrome_path,
            no_sandbox,
            debug_port,
        } => {
            run(
                &scenario,
                data.as_deref(),
                config.as_deref(),
                headed,
                chrome_path,
                no_sandbox,
                debug_port,
            )
            .await
        }
        Command::Validate { scenario } => validate(&scenario).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let scenario = Scenario::from_file(path)
        .await
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;
    scenario
        .validate()
        .with_context(|| format!("Invalid scenario {}", path.display()))?;
    Ok(scenario)
}

async fn validate(path: &Path) -> anyhow::Result<bool> {
    let scenario = load_scenario(path).await?;
    log::info!(
        "Scenario '{}' is valid ({} steps)",
        scenario.name,
        scenario.steps.len()
    );
    Ok(true)
}

#[allow(clippy::too_many_arguments)]
async fn run(
    scenario_path: &Path,
    data_path: Option<&Path>,
    config_path: Option<&Path>,
    headed: bool,
    chrome_path: Option<String>,
    no_sandbox: bool,
    debug_port: Option<u16>,
) -> anyhow::Result<bool> {
    let scenario = load_scenario(scenario_path).await?;

    let mut config = match config_path {
        Some(path) => DriverConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DriverConfig::default(),
    };
    config = config
        .with_env_overrides()
        .context("Invalid FORMDRIVER_* environment override")?;
    if headed {
        config.headless = false;
    }

    let records = match data_path {
        Some(path) => load_records(path).await?,
        None => vec![DataRecord::new()],
    };

    let driver = match debug_port {
        Some(port) => ChromeDriver::connect_debug_port(port).await?,
        None => ChromeDriver::launch(&config, chrome_path, no_sandbox).await?,
    };

    let document = Arc::new(driver.document().await?);
    let executor = ActionExecutor::new(document, config);
    let runner = ScenarioRunner::new(&executor);

    let mut reports: Vec<ExecutionReport> = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        log::info!(
            "Record {}/{} for scenario '{}'",
            i + 1,
            records.len(),
            scenario.name
        );
        reports.push(runner.run(&scenario, record).await?);
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);

    let all_passed = reports.iter().all(ExecutionReport::is_success);
    if debug_port.is_none() {
        if let Err(e) = driver.close().await {
            log::warn!("Failed to close browser: {}", e);
        }
    }
    Ok(all_passed)
}
