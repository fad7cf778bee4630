use anyhow::Result;
use cato_audit_feed::audit_api::{RetryPolicy, DEFAULT_ENDPOINT};
use cato_audit_feed::commands;
use cato_audit_feed::commands::export::ExportOptions;
use cato_audit_feed::config::{DEFAULT_TIMEFRAME, DEFAULT_TIMEOUT};
use cato_audit_feed::output::ExportFormat;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cato-audit")]
#[command(about = "Cato Networks audit feed exporter", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every audit event in a timeframe to a file
    Export {
        /// API key (falls back to CATO_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// File holding the API key (falls back to CATO_API_KEY_FILE)
        #[arg(long, conflicts_with = "api_key")]
        api_key_file: Option<PathBuf>,

        /// Numeric account ID (falls back to CATO_ACCOUNT_ID)
        #[arg(long)]
        account_id: Option<String>,

        /// Timeframe, e.g. last.P1D, last.PT12H, P7D or utc.<range>
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,

        /// Output file; .gz and .zst are compressed
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,

        /// Shorthand for --format csv
        #[arg(long, conflicts_with = "format")]
        csv: bool,

        /// GraphQL endpoint
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Retries after the first attempt for rate limits and transient failures
        #[arg(long, default_value_t = RetryPolicy::default().max_retries)]
        max_retries: u32,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
        timeout_secs: u64,

        /// Skip TLS certificate verification
        #[arg(long)]
        insecure: bool,
    },

    /// Generate shell completion scripts
    ///
    /// Output the completion script for your shell to stdout.
    /// Redirect to the appropriate file for your shell.
    ///
    /// Examples:
    ///   cato-audit generate-completion bash > /etc/bash_completion.d/cato-audit
    ///   cato-audit generate-completion zsh > ~/.zfunc/_cato-audit
    ///   cato-audit generate-completion fish > ~/.config/fish/completions/cato-audit.fish
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Export {
            api_key,
            api_key_file,
            account_id,
            timeframe,
            output,
            format,
            csv,
            endpoint,
            max_retries,
            timeout_secs,
            insecure,
        } => {
            let format = if csv { ExportFormat::Csv } else { format };
            commands::export::run(ExportOptions {
                api_key,
                api_key_file,
                account_id,
                timeframe,
                output,
                format,
                endpoint,
                max_retries,
                timeout_secs,
                insecure,
                show_progress: cli.verbose == 0,
            })
            .await
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cato-audit", &mut std::io::stdout());
            Ok(())
        }
    }
}
