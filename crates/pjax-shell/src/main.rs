//! pjax-shell entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use pjax_shell::{load_config, resolve_config_path, BrowserSession};

#[derive(Parser)]
#[command(
    name = "pjax-shell",
    about = "Headless shell for browsing a site through pjax navigation",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page and enter the interactive shell.
    Open {
        /// Page to load.
        url: String,

        /// Container for links that carry no container attribute.
        #[arg(long, default_value = "#main")]
        container: String,
    },

    /// Print the effective configuration as JSON.
    Config,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   pjax-shell completions bash > ~/.local/share/bash-completion/completions/pjax-shell
    ///   pjax-shell completions zsh > ~/.zfunc/_pjax-shell
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Open { url, container } => {
            let config = load_config(cli.config.as_deref())?;
            let session = BrowserSession::open(&url, config, &container).await?;
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || pjax_shell::repl::run(session, runtime))
                .await??;
        }

        Commands::Config => {
            let config = load_config(cli.config.as_deref())?;
            let source = resolve_config_path(cli.config.as_deref())
                .map(|p| p.display().to_string());
            let info = serde_json::json!({
                "source": source,
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "pjax-shell", &mut std::io::stdout());
        }
    }

    Ok(())
}
