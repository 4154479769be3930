//! Omnistrate CLI binary entrypoint.
//!
//! This is the main entry point for the `omnistrate-ctl` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use omni_workflow::WorkflowError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use omnistrate_ctl::cli::{Cli, Commands};
use omnistrate_ctl::client::FleetClient;
use omnistrate_ctl::commands::{AuthCommand, InstanceCommand, McpCommand, SnapshotCommand};
use omnistrate_ctl::config::Settings;
use omnistrate_ctl::mcp::McpConfig;
use omnistrate_ctl::output::OutputFormat;
use omnistrate_ctl::{CliError, CliResult};

/// Exit code for a run interrupted with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("omnistrate_ctl=debug,omni_workflow=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
            on_interrupt.cancel();
        }
    });

    match runtime.block_on(run_until_cancelled(cli, cancel)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            eprintln!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the command, abandoning it as soon as `cancel` fires.
async fn run_until_cancelled(cli: Cli, cancel: CancellationToken) -> CliResult<()> {
    let interrupted = cancel.clone();
    tokio::select! {
        result = run(cli, cancel) => result,
        () = interrupted.cancelled() => Err(WorkflowError::Cancelled.into()),
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> CliResult<()> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    // MCP commands only touch the assistant config
    if let Commands::Mcp {
        client_config,
        command,
    } = &cli.command
    {
        let path = match client_config {
            Some(path) => path.clone(),
            None => McpConfig::default_path()
                .ok_or_else(|| CliError::config("cannot determine config directory"))?,
        };
        return McpCommand::new(path).execute(&mut stdout, &format, command);
    }

    let settings = Settings::load(&cli)?;
    debug!(
        api_url = %settings.api_url,
        config = %settings.config_path.display(),
        "Settings loaded"
    );

    match cli.command {
        Commands::Login(args) => {
            let cmd = AuthCommand::new(settings);
            cmd.login(&mut stdout, &format, &args).await?;
        }
        Commands::Logout => {
            let cmd = AuthCommand::new(settings);
            cmd.logout(&mut stdout, &format)?;
        }
        Commands::Instance { command } => {
            let client = FleetClient::from_settings(&settings)?;
            let scope = settings.scope()?;
            let cmd = InstanceCommand::new(client, scope, settings.poll_interval, cancel);
            cmd.execute(&mut stdout, &format, &command).await?;
        }
        Commands::Snapshot { command } => {
            let client = FleetClient::from_settings(&settings)?;
            let scope = settings.scope()?;
            let cmd = SnapshotCommand::new(client, scope, settings.poll_interval, cancel);
            cmd.execute(&mut stdout, &format, &command).await?;
        }
        Commands::Mcp { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use omni_workflow::ActionType;
    use omnistrate_ctl::cli::{Format, InstanceCommands, McpCommands};
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    #[test]
    fn cli_parses_instance_list() {
        let cli = Cli::parse_from(["omnistrate-ctl", "instance", "list"]);
        match cli.command {
            Commands::Instance { command } => {
                assert!(matches!(command, InstanceCommands::List));
            }
            _ => panic!("expected instance command"),
        }
    }

    #[test]
    fn cli_respects_format_flag() {
        let cli = Cli::parse_from(["omnistrate-ctl", "--format", "json", "logout"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn cli_parses_workflow_action() {
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "instance",
            "workflow",
            "instance-abc",
            "--action",
            "restore",
        ]);
        match cli.command {
            Commands::Instance {
                command: InstanceCommands::Workflow { id, action, .. },
            } => {
                assert_eq!(id, "instance-abc");
                assert_eq!(action, ActionType::Restore);
            }
            _ => panic!("expected instance workflow"),
        }
    }

    #[tokio::test]
    async fn run_mcp_list_on_empty_config() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("claude_desktop_config.json");
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "mcp",
            "list",
            "--client-config",
            path.to_str().expect("utf8 path"),
        ]);
        assert!(matches!(
            cli.command,
            Commands::Mcp {
                command: McpCommands::List,
                ..
            }
        ));
        run(cli, CancellationToken::new()).await.expect("mcp list");
    }

    #[tokio::test]
    async fn run_instance_list_without_login_fails() {
        let dir = TempDir::new().expect("tempdir");
        let config = dir.path().join("config.toml");
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "--config",
            config.to_str().expect("utf8 path"),
            "instance",
            "list",
        ]);
        let result = run(cli, CancellationToken::new()).await;
        assert!(matches!(result, Err(CliError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn run_with_invalid_api_url_fails() {
        let dir = TempDir::new().expect("tempdir");
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "token = \"jwt\"\n").expect("write config");
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "--config",
            config.to_str().expect("utf8 path"),
            "--api-url",
            "ftp://fleet",
            "-s",
            "s-1",
            "-e",
            "se-1",
            "instance",
            "list",
        ]);
        let result = run(cli, CancellationToken::new()).await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[tokio::test]
    async fn interrupt_abandons_pending_request() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let dir = TempDir::new().expect("tempdir");
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "token = \"jwt\"\n").expect("write config");
        let api_url = format!("http://{addr}");
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "--config",
            config.to_str().expect("utf8 path"),
            "--api-url",
            api_url.as_str(),
            "-s",
            "s-1",
            "-e",
            "se-1",
            "instance",
            "list",
        ]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = run_until_cancelled(cli, cancel)
            .await
            .expect_err("interrupted");

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn finished_command_is_not_reported_as_interrupted() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("claude_desktop_config.json");
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "mcp",
            "list",
            "--client-config",
            path.to_str().expect("utf8 path"),
        ]);
        run_until_cancelled(cli, CancellationToken::new())
            .await
            .expect("mcp list");
    }
}
