//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use omni_workflow::ActionType;

/// Omnistrate CLI - manage service instances, snapshots and integrations.
#[derive(Parser, Debug, Clone)]
#[command(name = "omnistrate-ctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fleet API base URL.
    #[arg(long, env = "OMNISTRATE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Service ID.
    #[arg(short, long, env = "OMNISTRATE_SERVICE_ID", global = true)]
    pub service: Option<String>,

    /// Service environment ID.
    #[arg(short, long, env = "OMNISTRATE_ENVIRONMENT_ID", global = true)]
    pub environment: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Configuration file (defaults to the user config directory).
    #[arg(long, env = "OMNISTRATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in and store an API token.
    Login(LoginArgs),

    /// Forget the stored API token.
    Logout,

    /// Service instance management.
    Instance {
        /// Instance subcommand to execute.
        #[command(subcommand)]
        command: InstanceCommands,
    },

    /// Snapshot management.
    Snapshot {
        /// Snapshot subcommand to execute.
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Desktop assistant MCP server configuration.
    Mcp {
        /// Assistant configuration file to edit.
        #[arg(long, global = true)]
        client_config: Option<PathBuf>,

        /// MCP subcommand to execute.
        #[command(subcommand)]
        command: McpCommands,
    },
}

/// Arguments for the login command.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Account email.
    #[arg(long)]
    pub email: String,

    /// Account password.
    #[arg(long, env = "OMNISTRATE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Options for following a deployment workflow after an action.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitArgs {
    /// Follow the deployment workflow until it finishes.
    #[arg(short, long)]
    pub wait: bool,

    /// Seconds between workflow polls.
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,
}

/// Instance subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum InstanceCommands {
    /// List instances in the service environment.
    List,

    /// Show detailed information about an instance.
    Describe {
        /// Instance ID.
        id: String,
    },

    /// Create a new instance.
    Create(CreateInstanceArgs),

    /// Change instance parameters.
    Modify {
        /// Instance ID.
        id: String,

        /// Parameters to change (KEY=VALUE).
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Workflow options.
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Delete an instance.
    Delete {
        /// Instance ID.
        id: String,

        /// Workflow options.
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Start a stopped instance.
    Start {
        /// Instance ID.
        id: String,

        /// Workflow options.
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Stop a running instance.
    Stop {
        /// Instance ID.
        id: String,

        /// Workflow options.
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Restart an instance.
    Restart {
        /// Instance ID.
        id: String,

        /// Workflow options.
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Follow an in-flight deployment workflow.
    Workflow {
        /// Instance ID.
        id: String,

        /// Action whose workflow to follow.
        #[arg(short, long, default_value = "create")]
        action: ActionType,

        /// Seconds between workflow polls.
        #[arg(long, value_name = "SECONDS")]
        poll_interval: Option<u64>,
    },
}

/// Arguments for instance creation.
#[derive(Args, Debug, Clone)]
pub struct CreateInstanceArgs {
    /// Resource ID to deploy.
    #[arg(long)]
    pub resource: String,

    /// Cloud provider (aws, gcp, azure).
    #[arg(long)]
    pub cloud_provider: String,

    /// Cloud region.
    #[arg(long)]
    pub region: String,

    /// Instance parameters (KEY=VALUE).
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Workflow options.
    #[command(flatten)]
    pub wait: WaitArgs,
}

/// Snapshot subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SnapshotCommands {
    /// List snapshots of an instance.
    List {
        /// Instance ID.
        #[arg(short, long)]
        instance: String,
    },

    /// Show details of a snapshot.
    Describe {
        /// Snapshot ID.
        id: String,

        /// Instance ID.
        #[arg(short, long)]
        instance: String,
    },

    /// Take a snapshot of an instance.
    Create {
        /// Instance ID.
        #[arg(short, long)]
        instance: String,
    },

    /// Delete a snapshot.
    Delete {
        /// Snapshot ID.
        id: String,

        /// Instance ID.
        #[arg(short, long)]
        instance: String,
    },

    /// Restore a snapshot into a new instance.
    Restore {
        /// Snapshot ID.
        id: String,

        /// Instance ID the snapshot was taken from.
        #[arg(short, long)]
        instance: String,

        /// Parameter overrides for the restored instance (KEY=VALUE).
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Workflow options.
        #[command(flatten)]
        wait: WaitArgs,
    },
}

/// MCP subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum McpCommands {
    /// List configured MCP servers.
    List,

    /// Show one MCP server entry.
    Show {
        /// Server name.
        name: String,
    },

    /// Add an MCP server entry.
    Add(McpAddArgs),

    /// Remove an MCP server entry.
    Remove {
        /// Server name.
        name: String,
    },
}

/// Arguments for adding an MCP server.
#[derive(Args, Debug, Clone)]
pub struct McpAddArgs {
    /// Server name.
    pub name: String,

    /// Executable the assistant launches.
    #[arg(long)]
    pub command: String,

    /// Argument passed to the executable (repeatable).
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Environment variable for the server (KEY=VALUE, repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Replace an existing entry with the same name.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_help_does_not_panic() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_instance_list_defaults() {
        let cli = Cli::parse_from(["omnistrate-ctl", "instance", "list"]);
        assert!(matches!(
            cli.command,
            Commands::Instance {
                command: InstanceCommands::List
            }
        ));
        assert_eq!(cli.format, Format::Table);
        assert!(!cli.verbose);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "instance",
            "list",
            "--service",
            "s-123",
            "-e",
            "se-456",
            "--format",
            "json",
        ]);
        assert_eq!(cli.service.as_deref(), Some("s-123"));
        assert_eq!(cli.environment.as_deref(), Some("se-456"));
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn parse_create_with_wait() {
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "instance",
            "create",
            "--resource",
            "r-postgres",
            "--cloud-provider",
            "aws",
            "--region",
            "us-east-2",
            "-p",
            "version=16",
            "--param",
            "replicas=3",
            "--wait",
            "--poll-interval",
            "5",
        ]);
        match cli.command {
            Commands::Instance {
                command: InstanceCommands::Create(args),
            } => {
                assert_eq!(args.resource, "r-postgres");
                assert_eq!(args.params, vec!["version=16", "replicas=3"]);
                assert!(args.wait.wait);
                assert_eq!(args.wait.poll_interval, Some(5));
            }
            _ => panic!("expected instance create command"),
        }
    }

    #[test]
    fn parse_workflow_action() {
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "instance",
            "workflow",
            "instance-abc",
            "--action",
            "Restore",
        ]);
        match cli.command {
            Commands::Instance {
                command: InstanceCommands::Workflow { id, action, .. },
            } => {
                assert_eq!(id, "instance-abc");
                assert_eq!(action, ActionType::Restore);
            }
            _ => panic!("expected instance workflow command"),
        }
    }

    #[test]
    fn workflow_action_defaults_to_create() {
        let cli = Cli::parse_from(["omnistrate-ctl", "instance", "workflow", "instance-abc"]);
        match cli.command {
            Commands::Instance {
                command: InstanceCommands::Workflow { action, .. },
            } => assert_eq!(action, ActionType::Create),
            _ => panic!("expected instance workflow command"),
        }
    }

    #[test]
    fn invalid_action_is_rejected() {
        let result = Cli::try_parse_from([
            "omnistrate-ctl",
            "instance",
            "workflow",
            "instance-abc",
            "--action",
            "explode",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_snapshot_restore() {
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "snapshot",
            "restore",
            "snap-1",
            "--instance",
            "instance-abc",
            "--wait",
        ]);
        match cli.command {
            Commands::Snapshot {
                command:
                    SnapshotCommands::Restore {
                        id, instance, wait, ..
                    },
            } => {
                assert_eq!(id, "snap-1");
                assert_eq!(instance, "instance-abc");
                assert!(wait.wait);
            }
            _ => panic!("expected snapshot restore command"),
        }
    }

    #[test]
    fn parse_mcp_add_with_hyphen_args() {
        let cli = Cli::parse_from([
            "omnistrate-ctl",
            "mcp",
            "add",
            "omnistrate",
            "--command",
            "omnistrate-ctl",
            "--arg",
            "--stdio",
            "--env",
            "LOG=debug",
            "--client-config",
            "/tmp/claude.json",
        ]);
        match cli.command {
            Commands::Mcp {
                client_config,
                command: McpCommands::Add(args),
            } => {
                assert_eq!(client_config, Some(PathBuf::from("/tmp/claude.json")));
                assert_eq!(args.name, "omnistrate");
                assert_eq!(args.args, vec!["--stdio"]);
                assert_eq!(args.env, vec!["LOG=debug"]);
                assert!(!args.force);
            }
            _ => panic!("expected mcp add command"),
        }
    }

    #[test]
    fn login_requires_email() {
        let result = Cli::try_parse_from(["omnistrate-ctl", "login", "--password", "secret"]);
        assert!(result.is_err());
    }
}
