//! # jsonrpc2 CLI Entry Point
//!
//! One-shot JSON-RPC calls from the shell. The result is printed as raw JSON
//! on stdout so it can be piped into other tools.
//!
//! ## Usage
//!
//! ```bash
//! # Call a method over HTTP
//! jsonrpc2 call http://127.0.0.1:8080/rpc Foo.Bar -p '{"foo": "bar"}'
//!
//! # Call over raw TCP with a 2 second deadline
//! jsonrpc2 call tcp://127.0.0.1:4003 Foo.Bar -p '[1, 2]' -t 2000
//!
//! # Fire-and-forget (null id)
//! jsonrpc2 notify http://127.0.0.1:8080/rpc Events.Publish -p '"hello"'
//! ```
//!
//! ## Environment
//!
//! - `JSONRPC2_TIMEOUT_MS`: default timeout when `-t` is not given
//! - `JSONRPC2_USER_AGENT`: default user agent when `--user-agent` is not given
//! - `RUST_LOG`: log filter used with `-v` (defaults to `info`)

use anyhow::{Context, Result};
use argh::FromArgs;
use jsonrpc2_client::{CallOptions, Client, ClientConfig, LogEntry};
use serde_json::Value;

/// Fallback for `--timeout-ms`
const TIMEOUT_ENV: &str = "JSONRPC2_TIMEOUT_MS";

/// Fallback for `--user-agent`
const USER_AGENT_ENV: &str = "JSONRPC2_USER_AGENT";

/// Validates that an address starts with http:// or tcp://
///
/// # Errors
///
/// Returns an error for any other scheme, including https:// (the HTTP
/// client speaks plain HTTP/1.1 only).
fn validate_address(address: &str) -> Result<()> {
    if address.starts_with("http://") || address.starts_with("tcp://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid server address: '{}' must start with http:// or tcp://",
            address
        ))
    }
}

#[derive(FromArgs)]
/// jsonrpc2 - JSON-RPC 2.0 calls over HTTP or raw TCP
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Call**: make a call and print its result
/// - **Notify**: make a call with a null id
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Call(CallArgs),
    Notify(NotifyArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call a remote method and print its result as JSON
struct CallArgs {
    /// address of the server (http://host:port/path or tcp://host:port)
    #[argh(positional)]
    address: String,

    /// name of the remote method
    #[argh(positional)]
    method: String,

    /// JSON parameters for the method
    ///
    /// Non-array values are wrapped into a one-element array unless
    /// --no-force-array is given. Defaults to `[]`.
    #[argh(option, short = 'p', default = "\"[]\".into()")]
    params: String,

    /// timeout in milliseconds (default: $JSONRPC2_TIMEOUT_MS, then 10000)
    #[argh(option, short = 't', long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// send params exactly as given
    #[argh(switch, long = "no-force-array")]
    no_force_array: bool,

    /// value of the User-Agent header for HTTP requests (default: $JSONRPC2_USER_AGENT)
    #[argh(option, long = "user-agent")]
    user_agent: Option<String>,

    /// log each call to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "notify")]
/// send a call with a null id and print whatever comes back
struct NotifyArgs {
    /// address of the server (http://host:port/path or tcp://host:port)
    #[argh(positional)]
    address: String,

    /// name of the remote method
    #[argh(positional)]
    method: String,

    /// JSON parameters for the method (default: `[]`)
    #[argh(option, short = 'p', default = "\"[]\".into()")]
    params: String,

    /// timeout in milliseconds (default: $JSONRPC2_TIMEOUT_MS, then 10000)
    #[argh(option, short = 't', long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// value of the User-Agent header for HTTP requests (default: $JSONRPC2_USER_AGENT)
    #[argh(option, long = "user-agent")]
    user_agent: Option<String>,

    /// log each call to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,
}

/// A call to perform, whichever subcommand requested it.
#[derive(Debug, Clone, PartialEq)]
struct Invocation {
    address: String,
    method: String,
    params: String,
    timeout_ms: Option<u64>,
    force_array: bool,
    is_async: bool,
    user_agent: Option<String>,
    verbose: bool,
}

impl From<Commands> for Invocation {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Call(args) => Invocation {
                address: args.address,
                method: args.method,
                params: args.params,
                timeout_ms: args.timeout_ms,
                force_array: !args.no_force_array,
                is_async: false,
                user_agent: args.user_agent,
                verbose: args.verbose,
            },
            Commands::Notify(args) => Invocation {
                address: args.address,
                method: args.method,
                params: args.params,
                timeout_ms: args.timeout_ms,
                force_array: true,
                is_async: true,
                user_agent: args.user_agent,
                verbose: args.verbose,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();
    let invocation = Invocation::from(cli.command);

    // Only log when asked: stdout carries the result and must stay clean
    if invocation.verbose {
        // Set default log level to INFO, but allow RUST_LOG env var to override
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = run(invocation, |key| std::env::var(key).ok()).await?;

    // Output raw JSON to stdout
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}

/// Builds the client configuration, falling back to environment variables
/// for anything not given on the command line.
fn resolve_config(
    invocation: &Invocation,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig> {
    let mut config = ClientConfig::default();

    let timeout_ms = match invocation.timeout_ms {
        Some(ms) => Some(ms),
        None => env(TIMEOUT_ENV)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid {}: '{}'", TIMEOUT_ENV, raw))
            })
            .transpose()?,
    };
    if let Some(ms) = timeout_ms {
        config = config.with_timeout_ms(ms);
    }

    if let Some(user_agent) = invocation.user_agent.clone().or_else(|| env(USER_AGENT_ENV)) {
        config = config.with_user_agent(user_agent);
    }

    if invocation.verbose {
        config = config.with_logger(log_entry);
    }

    Ok(config)
}

fn log_entry(entry: &LogEntry<'_>) {
    match entry.error {
        None => {
            let result = entry.result.unwrap_or(&Value::Null);
            tracing::info!(
                method = entry.method,
                addr = entry.addr,
                duration_ms = entry.duration.as_millis() as u64,
                params = %entry.params,
                result = %result,
                "call succeeded"
            )
        }
        Some(error) => {
            let code = error.code();
            tracing::error!(
                method = entry.method,
                addr = entry.addr,
                duration_ms = entry.duration.as_millis() as u64,
                params = %entry.params,
                error = %error,
                code = code.as_deref().unwrap_or("-"),
                "call failed"
            )
        }
    }
}

/// Performs one call and returns its result.
///
/// # Errors
///
/// Returns an error if:
/// - The address does not use a supported scheme
/// - The params string is not valid JSON
/// - The call itself fails
async fn run(invocation: Invocation, env: impl Fn(&str) -> Option<String>) -> Result<Value> {
    validate_address(&invocation.address)?;

    let params: Value = serde_json::from_str(&invocation.params)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in params: {}", e))?;

    let config = resolve_config(&invocation, env)?;
    let client = Client::new(invocation.address.as_str(), config)?;

    let mut options = CallOptions::default().with_force_array(invocation.force_array);
    if invocation.is_async {
        options = options.asynchronous();
    }

    let result = client
        .call(invocation.method.as_str(), params, options)
        .await
        .with_context(|| format!("Call to '{}' failed", invocation.method))?;

    Ok(result)
}
