use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};
use snipkeep::Config;
use snipkeep::capture::{
    CaptureError, cancel::cancel_pair, dependencies::CaptureDependencies,
    launcher::SystemCommandRunner, run_capture_flow,
};
use snipkeep::daemon::Daemon;

#[derive(Parser, Debug)]
#[command(name = "snipkeep")]
#[command(
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SNIPKEEP_GIT_HASH"), ")"),
    about = "Save screen snips from the native snipping tool as PNG files"
)]
struct Cli {
    /// Run as daemon (background, capture on SIGUSR1 or a `capture` line on stdin)
    #[arg(long, short = 'd', action = ArgAction::SetTrue, conflicts_with = "once")]
    daemon: bool,

    /// Run a single capture in the foreground and print the saved path
    #[arg(long, short = 'o', action = ArgAction::SetTrue)]
    once: bool,

    /// Override how long to wait for the snip, in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Override the directory snips are written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Write a documented config file to the config directory and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["daemon", "once"])]
    init_config: bool,

    /// Write the effective config (including overrides) to the config file and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["daemon", "once", "init_config"])]
    write_config: bool,

    /// Print the config file location and exit
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["daemon", "once"])]
    print_config_path: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if cli.print_config_path {
        println!("{}", Config::get_config_path()?.display());
        return Ok(());
    }

    if cli.init_config {
        let path = Config::create_default_file()?;
        println!("Created config at {}", path.display());
        return Ok(());
    }

    if !cli.daemon && !cli.once && !cli.write_config {
        print_usage();
        return Ok(());
    }

    let mut config = Config::load()?;
    config.apply_overrides(cli.timeout_ms, cli.output_dir);

    if cli.write_config {
        let path = config.save()?;
        println!("Wrote config to {}", path.display());
        return Ok(());
    }

    if cli.daemon {
        log::info!("Starting in daemon mode");
        let mut daemon = Daemon::new(&config)?;
        daemon.run()?;
    } else {
        run_once(&config)?;
    }

    Ok(())
}

/// One foreground capture; Ctrl-C cancels it.
fn run_once(config: &Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let dependencies = Arc::new(CaptureDependencies {
        runner: Arc::new(SystemCommandRunner::new(config.launch_grace())),
        ..CaptureDependencies::default()
    });
    let request = config.capture_request();

    let result = runtime.block_on(async move {
        let (trigger, token) = cancel_pair();
        let flow = run_capture_flow(request, dependencies, token, |status| {
            log::debug!("Capture status: {:?}", status);
        });
        tokio::pin!(flow);

        tokio::select! {
            result = &mut flow => result,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted - cancelling capture");
                trigger.cancel();
                flow.await
            }
        }
    });

    match result {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(CaptureError::NoNewImage { waited }) => {
            println!(
                "No new snip appeared on the clipboard within {} ms - nothing saved",
                waited.as_millis()
            );
            Ok(())
        }
        Err(CaptureError::Cancelled) => {
            println!("Capture cancelled - nothing saved");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_usage() {
    println!("snipkeep: Save screen snips from the native snipping tool as PNG files");
    println!();
    println!("Usage:");
    println!("  snipkeep --daemon              Run as background daemon (capture on hotkey)");
    println!("  snipkeep --once                Capture one snip and print the saved path");
    println!("  snipkeep --init-config         Write a documented config file");
    println!("  snipkeep --write-config        Save the effective config (with overrides)");
    println!("  snipkeep --print-config-path   Show where the config file lives");
    println!("  snipkeep --help                Show help");
    println!();
    println!("Daemon mode (recommended):");
    println!("  1. Run: snipkeep --daemon");
    println!("  2. Bind a hotkey to: pkill -SIGUSR1 snipkeep");
    println!("     (or type 'capture' into the daemon's stdin)");
    println!("  3. Draw the snip; it is saved under <Pictures>/openweb_images");
}
