use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use lhremote_cli::commands;
use lhremote_cli::{ConnectionArgs, OutputFormat};

#[derive(Parser)]
#[command(name = "lhremote")]
#[command(author, version)]
#[command(
    about = "Control launcher instances and campaigns over the Chrome DevTools Protocol",
    long_about = "lhremote connects to the launcher's debug port, finds the per-account \
                  instance it spawned, starts and stops instances, and drives campaigns \
                  through the instance's automation engine."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// List accounts configured in the launcher
    Accounts,

    /// Check the launcher UI health for an account
    Health {
        /// Account to check (defaults to the only configured account)
        #[arg(long)]
        account_id: Option<i64>,
    },

    /// Start, stop and inspect account instances
    Instance {
        #[command(subcommand)]
        command: InstanceCommand,
    },

    /// Start, stop, retry and inspect campaigns
    Campaign {
        #[command(subcommand)]
        command: CampaignCommand,
    },

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts for lhremote.

SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    bash:  lhremote completion --shell bash >> ~/.bashrc
    zsh:   lhremote completion --shell zsh > \"${fpath[1]}/_lhremote\"
    fish:  lhremote completion --shell fish > ~/.config/fish/completions/lhremote.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum InstanceCommand {
    /// Start the account's instance unless it is already running
    Start {
        #[arg(long)]
        account_id: Option<i64>,
    },

    /// Stop the account's instance
    Stop {
        #[arg(long)]
        account_id: Option<i64>,

        /// Kill the instance processes if it does not stop in time
        #[arg(long)]
        force: bool,
    },

    /// Show the instance processes and their debug ports
    Status,
}

#[derive(Subcommand)]
enum CampaignCommand {
    /// Start a campaign and wait until the runner picks it up
    Start {
        /// Campaign to start
        #[arg(value_name = "CAMPAIGN_ID")]
        campaign_id: i64,

        /// Persons to queue (comma-separated or repeated)
        #[arg(long = "person-id", value_delimiter = ',')]
        person_ids: Vec<i64>,

        #[arg(long)]
        account_id: Option<i64>,
    },

    /// Pause a campaign and wait until the runner is idle
    Stop {
        #[arg(value_name = "CAMPAIGN_ID")]
        campaign_id: i64,

        #[arg(long)]
        account_id: Option<i64>,
    },

    /// Reset persons so the campaign processes them again
    Retry {
        #[arg(value_name = "CAMPAIGN_ID")]
        campaign_id: i64,

        /// Persons to re-queue (comma-separated or repeated)
        #[arg(long = "person-id", value_delimiter = ',', required = true)]
        person_ids: Vec<i64>,

        #[arg(long)]
        account_id: Option<i64>,
    },

    /// Show campaign state, queue counts and runner state
    Status {
        #[arg(value_name = "CAMPAIGN_ID")]
        campaign_id: i64,

        #[arg(long)]
        account_id: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Commands::Completion { shell } = cli.command {
        return commands::completion::execute(shell, &mut Cli::command());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let orchestrator = cli.connection.orchestrator()?;
    let format = cli.format;

    match cli.command {
        Commands::Accounts => commands::accounts::execute(&orchestrator, format).await,
        Commands::Health { account_id } => {
            commands::health::execute(&orchestrator, account_id, format).await
        }
        Commands::Instance { command } => match command {
            InstanceCommand::Start { account_id } => {
                commands::instance::start(&orchestrator, account_id, format).await
            }
            InstanceCommand::Stop { account_id, force } => {
                commands::instance::stop(&orchestrator, account_id, force, format).await
            }
            InstanceCommand::Status => commands::instance::status(&orchestrator, format).await,
        },
        Commands::Campaign { command } => match command {
            CampaignCommand::Start {
                campaign_id,
                person_ids,
                account_id,
            } => {
                commands::campaign::start(&orchestrator, account_id, campaign_id, person_ids, format)
                    .await
            }
            CampaignCommand::Stop {
                campaign_id,
                account_id,
            } => commands::campaign::stop(&orchestrator, account_id, campaign_id, format).await,
            CampaignCommand::Retry {
                campaign_id,
                person_ids,
                account_id,
            } => {
                commands::campaign::retry(&orchestrator, account_id, campaign_id, person_ids, format)
                    .await
            }
            CampaignCommand::Status {
                campaign_id,
                account_id,
            } => commands::campaign::status(&orchestrator, account_id, campaign_id, format).await,
        },
        Commands::Completion { .. } => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("lhremote=debug,lhremote_cli=debug,lhremote_core=debug,lhremote_cdp=debug")
    } else {
        EnvFilter::new("lhremote=info,lhremote_cli=info,lhremote_core=warn,lhremote_cdp=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
