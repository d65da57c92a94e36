//! Starts the native snipping UI through an ordered chain of invocation strategies.
//!
//! Different OS builds expose the same capture overlay through different entry
//! points (URI scheme, packaged executable in one of two system folders, or the
//! store app shell), and none of them is guaranteed to exist. Strategies are
//! plain data so the chain can be configured and tested without touching the OS.

use std::{process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::{process::Command, time};

use crate::capture::{
    dependencies::CommandRunner,
    types::{ExecError, LaunchError, StrategyFailure},
};

/// One candidate way of opening the capture tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LaunchStrategy {
    /// Human-readable name used in logs and error reports
    pub label: String,
    /// Executable to run (name on PATH or absolute path)
    pub program: String,
    /// Arguments passed verbatim to the program
    #[serde(default)]
    pub args: Vec<String>,
}

impl LaunchStrategy {
    pub fn new(label: &str, program: &str, args: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }
}

/// Built-in chain, cheapest and most modern entry point first.
pub fn default_strategies() -> Vec<LaunchStrategy> {
    fn powershell(command: &str) -> [&str; 5] {
        ["-NoProfile", "-WindowStyle", "Hidden", "-Command", command]
    }

    vec![
        LaunchStrategy::new(
            "ms-screenclip via cmd start",
            "cmd",
            &["/c", "start", "", "ms-screenclip:"],
        ),
        LaunchStrategy::new(
            "ms-screenclip via PowerShell Start-Process",
            "powershell",
            &powershell("Start-Process ms-screenclip:"),
        ),
        LaunchStrategy::new("snippingtool /clip", "snippingtool", &["/clip"]),
        LaunchStrategy::new(
            "System32 SnippingTool.exe /clip",
            r"C:\Windows\System32\SnippingTool.exe",
            &["/clip"],
        ),
        LaunchStrategy::new(
            "Sysnative SnippingTool.exe /clip",
            r"C:\Windows\Sysnative\SnippingTool.exe",
            &["/clip"],
        ),
        LaunchStrategy::new(
            "ScreenSketch app via shell:AppsFolder",
            "powershell",
            &powershell(r"Start-Process shell:AppsFolder\Microsoft.ScreenSketch_8wekyb3d8bbwe!App"),
        ),
    ]
}

/// Tries each strategy in order and stops at the first that starts without error.
#[derive(Clone)]
pub struct CaptureToolLauncher {
    strategies: Vec<LaunchStrategy>,
    runner: Arc<dyn CommandRunner>,
}

impl CaptureToolLauncher {
    pub fn new(strategies: Vec<LaunchStrategy>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { strategies, runner }
    }

    /// Launch the capture tool.
    ///
    /// Success only means an invocation completed without an OS-level error; it
    /// says nothing about whether the user finished snipping.
    ///
    /// # Errors
    /// [`LaunchError::AllStrategiesFailed`] with one diagnostic per strategy when
    /// none of them worked (including the degenerate empty chain).
    pub async fn launch(&self) -> Result<(), LaunchError> {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for (index, strategy) in self.strategies.iter().enumerate() {
            log::debug!(
                "Launch attempt {}/{}: {}",
                index + 1,
                self.strategies.len(),
                strategy.label
            );
            match self.runner.run(strategy).await {
                Ok(()) => {
                    log::info!("Capture tool started ({})", strategy.label);
                    return Ok(());
                }
                Err(error) => {
                    log::warn!("Launch strategy '{}' failed: {}", strategy.label, error);
                    failures.push(StrategyFailure {
                        label: strategy.label.clone(),
                        error,
                    });
                }
            }
        }

        log::error!("All {} capture tool launch strategies failed", failures.len());
        Err(LaunchError::AllStrategiesFailed { failures })
    }
}

/// Runs strategies as real child processes.
///
/// A process that exits non-zero (or cannot be spawned) fails the strategy. A
/// process that is still running once the grace period elapses is treated as a
/// started tool and left running on its own.
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    grace: Duration,
}

impl SystemCommandRunner {
    pub const DEFAULT_GRACE: Duration = Duration::from_secs(2);

    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GRACE)
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, strategy: &LaunchStrategy) -> Result<(), ExecError> {
        let program = strategy.program.clone();
        let child = Command::new(&strategy.program)
            .args(&strategy.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| ExecError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            })?;

        let pid = child.id();
        match time::timeout(self.grace, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => Err(ExecError::NonZeroExit {
                program,
                code: output
                    .status
                    .code()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            Ok(Err(e)) => Err(ExecError::Wait {
                program,
                message: e.to_string(),
            }),
            Err(_) => {
                log::debug!(
                    "`{}` (pid {:?}) still running after {}ms; leaving it detached",
                    program,
                    pid,
                    self.grace.as_millis()
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_prefers_uri_scheme_and_ends_with_app_shell() {
        let strategies = default_strategies();
        assert_eq!(strategies.len(), 6);
        assert_eq!(strategies[0].program, "cmd");
        assert_eq!(strategies[0].args, ["/c", "start", "", "ms-screenclip:"]);
        assert!(strategies[3].program.ends_with(r"System32\SnippingTool.exe"));
        assert!(strategies[4].program.ends_with(r"Sysnative\SnippingTool.exe"));
        let last = strategies.last().unwrap();
        assert_eq!(last.program, "powershell");
        assert!(last.args.last().unwrap().contains("Microsoft.ScreenSketch_8wekyb3d8bbwe!App"));
    }

    #[tokio::test]
    async fn missing_program_reports_spawn_error() {
        let runner = SystemCommandRunner::new(Duration::from_millis(200));
        let strategy = LaunchStrategy::new("missing", "snipkeep-definitely-not-installed", &[]);
        let err = runner.run(&strategy).await.unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }), "unexpected: {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let runner = SystemCommandRunner::new(Duration::from_secs(5));
        let strategy = LaunchStrategy::new("fails", "sh", &["-c", "echo nope >&2; exit 3"]);
        match runner.run(&strategy).await.unwrap_err() {
            ExecError::NonZeroExit { code, stderr, .. } => {
                assert_eq!(code, "3");
                assert_eq!(stderr, "nope");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn long_running_process_counts_as_started() {
        let runner = SystemCommandRunner::new(Duration::from_millis(50));
        let strategy = LaunchStrategy::new("stays open", "sleep", &["1"]);
        runner.run(&strategy).await.expect("detached process is a success");
    }
}
