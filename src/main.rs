mod actuator;
mod collectors;
mod config;
mod confirm;
mod readiness;
mod render;
mod runner;
mod script;
mod state;
#[cfg(test)]
mod testing;

use actuator::{ActionError, Actuator, TestOutcome};
use clap::{Parser, Subcommand};
use collectors::Inspector;
use config::Config;
use confirm::{Always, Confirm, Prompt, TerminalConfirm};
use runner::{Spawned, SystemRunner};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;
const EXIT_NOT_READY: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "hibernation-helper")]
#[command(version, about = "Check, enable and disable hibernation on Linux")]
struct Cli {
    #[arg(long, global = true, help = "YAML config file; built-in defaults when omitted")]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show RAM, swap and kernel resume configuration with a readiness verdict
    Status {
        #[arg(long, help = "Output machine-readable JSON")]
        json: bool,
    },
    /// Configure resume from a swap partition, or create a swap file
    Enable {
        #[arg(long, short = 'y', help = "Answer yes to every confirmation")]
        yes: bool,
    },
    /// Remove resume parameters and optionally the swap file
    Disable {
        #[arg(long, short = 'y', help = "Answer yes to every confirmation")]
        yes: bool,
        #[arg(long, help = "Never offer to remove the swap file")]
        keep_swap_file: bool,
    },
    /// Hibernate right now
    Test {
        #[arg(long, short = 'y', help = "Answer yes to every confirmation")]
        yes: bool,
        #[arg(long, help = "Hibernate even when the status check says not ready")]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                std::process::exit(EXIT_FAILURE);
            }
        },
        None => Config::default(),
    };

    let runner = SystemRunner::new(cfg.commands.elevate.clone());
    let command = cli.command.unwrap_or(Commands::Status { json: false });
    let code = run(command, &cfg, &runner).await;
    std::process::exit(code);
}

async fn run(command: Commands, cfg: &Config, runner: &SystemRunner) -> i32 {
    let inspector = Inspector::new(cfg, runner);
    let actuator = Actuator::new(cfg, runner);

    match command {
        Commands::Status { json } => {
            let inspection = inspector.inspect().await;
            if json {
                match serde_json::to_string_pretty(&inspection) {
                    Ok(text) => println!("{text}"),
                    Err(err) => {
                        error!(error = %err, "failed to serialize status");
                        return EXIT_FAILURE;
                    }
                }
            } else {
                println!("{}", render::format_status(&inspection));
            }
            if inspection.verdict.ready {
                0
            } else {
                EXIT_NOT_READY
            }
        }
        Commands::Enable { yes } => {
            let confirm = confirmer(yes);
            let result = actuator.enable(confirm.as_ref()).await;
            report(result, &inspector).await
        }
        Commands::Disable {
            yes,
            keep_swap_file,
        } => {
            let base = confirmer(yes);
            let confirm = |prompt: &Prompt| match prompt {
                Prompt::RemoveSwapFile { .. } if keep_swap_file => false,
                _ => base.confirm(prompt),
            };
            let result = actuator.disable(&confirm).await;
            report(result, &inspector).await
        }
        Commands::Test { yes, force } => {
            let inspection = inspector.inspect().await;
            if !inspection.verdict.ready && !force {
                eprintln!("{}", inspection.verdict.reason);
                eprintln!("Refusing to hibernate; pass --force to try anyway.");
                return EXIT_NOT_READY;
            }
            finish_test(actuator.test(confirmer(yes).as_ref())).await
        }
    }
}

/// Keeps the process alive until the elevated hibernate request exits;
/// `pkexec` will not act for a child whose parent has gone.
async fn finish_test<H: Spawned>(result: Result<TestOutcome<H>, ActionError>) -> i32 {
    let handle = match result {
        Ok(TestOutcome::Started(handle)) => handle,
        Ok(outcome) => {
            println!("{outcome}");
            return 0;
        }
        Err(err) => {
            error!(error = %err, "failed to start hibernation");
            eprintln!("{err}");
            return EXIT_FAILURE;
        }
    };
    println!("Hibernation requested; waiting for the system to resume.");
    match actuator::wait_for_hibernate(handle).await {
        Ok(()) => {
            info!("resumed from hibernation");
            0
        }
        Err(err) => {
            error!(error = %err, "hibernation failed");
            eprintln!("{err}");
            EXIT_FAILURE
        }
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(Always(true))
    } else {
        Box::new(TerminalConfirm)
    }
}

async fn report<T, E>(result: Result<T, E>, inspector: &Inspector<'_, SystemRunner>) -> i32
where
    T: std::fmt::Display,
    E: std::fmt::Display,
{
    match result {
        Ok(outcome) => {
            println!("{outcome}");
            let fresh = inspector.inspect().await;
            info!(ready = fresh.verdict.ready, reason = %fresh.verdict.reason, "status after change");
            0
        }
        Err(err) => {
            error!(error = %err, "action failed");
            eprintln!("{err}");
            EXIT_FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
