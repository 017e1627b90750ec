//! Command-line front end for the Ubersmith API client.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use ubersmith_core::{ClientConfig, Error, Params, RequestFormat, UbersmithClient};

#[derive(Debug, Parser)]
#[command(name = "ubersmith")]
#[command(about = "Call methods on an Ubersmith billing API", long_about = None, version)]
struct Cli {
    /// Base URL of the Ubersmith install, e.g. https://billing.example.com
    #[arg(long, env = "UBERSMITH_URL")]
    url: String,

    #[arg(long, env = "UBERSMITH_USERNAME")]
    username: String,

    /// API token for the user
    #[arg(long, env = "UBERSMITH_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Request timeout in seconds [default: none]
    #[arg(long, env = "UBERSMITH_TIMEOUT_SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Send parameters as a JSON body instead of a form
    #[arg(long)]
    json_request: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Invoke any API method
    Call {
        /// Method name, e.g. client.get
        #[arg(value_name = "METHOD")]
        method: String,

        #[arg(value_name = "KEY=VALUE", value_parser = parse_assignment)]
        params: Vec<(String, String)>,
    },

    /// Check a client login and password
    CheckLogin { login: String, password: String },

    /// Fetch a client record
    GetClient {
        client_id: String,

        /// Include the client's metadata
        #[arg(long)]
        metadata: bool,
    },

    /// Update fields on a client record (meta_* keys update metadata)
    UpdateClient {
        client_id: String,

        #[arg(value_name = "KEY=VALUE", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("missing key in {raw:?}")),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

fn init_logging(verbosity: u8) {
    let base_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn build_client(cli: &Cli) -> UbersmithClient {
    let mut config = ClientConfig::new(&cli.url, &cli.username, &cli.token);
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if cli.json_request {
        config = config.with_request_format(RequestFormat::Json);
    }
    debug!(?config, "client configured");
    UbersmithClient::from_config(config)
}

fn run(cli: &Cli) -> Result<Value, Error> {
    let client = build_client(cli);
    match &cli.command {
        Command::Call { method, params } => client.call(method, &params.iter().cloned().collect::<Params>()),
        Command::CheckLogin { login, password } => client.check_login(login, password),
        Command::GetClient { client_id, metadata } => client.get_client(client_id, *metadata),
        Command::UpdateClient { client_id, fields } => {
            client.update_client(client_id, fields.iter().cloned().collect())
        }
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("rendering response")?;
    println!("{rendered}");
    Ok(())
}

/// Exit status and stderr line for a failed call. API rejections exit 2,
/// everything else 1.
fn failure_report(err: &Error) -> (u8, String) {
    match err {
        Error::Api(api) => (2, format!("Error: {} ({})", api.message, api.code_display())),
        other => (1, format!("Error: {other}")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_verbosity);

    match run(&cli) {
        Ok(data) => match print_json(&data) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            let (code, message) = failure_report(&err);
            eprintln!("{message}");
            ExitCode::from(code)
        }
    }
}
