use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::HostConfig;
use crate::description::{EndpointDescriptor, InstanceMode};
use crate::logging::{init_logging_with_config, LogConfig};
use crate::policy::{BasicAuthPolicy, ServiceThrottlingBehavior, TracingBehavior};
use crate::runtime_config::RuntimeConfig;
use crate::sample::{sample_contract, SampleService, SampleStore};
use crate::server::{EndpointBinding, HttpBinding, RestService};

/// Listening address used when nothing else is configured.
pub const DEFAULT_ADDR: &str = "127.0.0.1:9200";

/// Command-line interface for resthost
#[derive(Parser, Debug)]
#[command(name = "resthost", version, about = "Embeddable REST service host", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host the sample service over HTTP
    Serve {
        /// Host configuration file (YAML or JSON)
        #[arg(short, long, env = "RESTHOST_CONFIG")]
        config: Option<PathBuf>,

        /// Additional HOST:PORT to serve the contract at
        #[arg(short, long)]
        addr: Option<String>,
    },
    /// Print the compiled routes of every configured endpoint
    Routes {
        /// Host configuration file (YAML or JSON)
        #[arg(short, long, env = "RESTHOST_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HostConfig> {
    match path {
        Some(path) => HostConfig::load(path),
        None => Ok(HostConfig::default()),
    }
}

/// Assemble the sample service described by `config`.
///
/// `addr` adds an endpoint at `http://{addr}/`. With neither configured
/// endpoints nor `addr`, [`DEFAULT_ADDR`] is used. Every endpoint is attached
/// through `binding` when one is given.
pub fn build_service(
    config: &HostConfig,
    addr: Option<&str>,
    binding: Option<Arc<dyn EndpointBinding>>,
) -> anyhow::Result<RestService> {
    let runtime = RuntimeConfig::from_env();
    let name = config.service.name.as_str();
    let mut service = match config.service.instancing {
        InstanceMode::Singleton => RestService::singleton(name, SampleService::new()),
        InstanceMode::PerCall => {
            let store = Arc::new(SampleStore::new());
            RestService::per_call(name, move || SampleService::with_store(Arc::clone(&store)))
        }
    }
    .with_runtime_config(runtime);

    if let Some(throttling) = &config.throttling {
        let behavior = match throttling.max_concurrency {
            Some(max) => ServiceThrottlingBehavior::with_retry_after(max, throttling.retry_after_secs),
            None => ServiceThrottlingBehavior::for_available_cores(),
        };
        service.add_service_behavior(Arc::new(behavior))?;
    }
    if let Some(basic) = config.auth.as_ref().and_then(|auth| auth.basic.as_ref()) {
        let policy = BasicAuthPolicy::new(&basic.realm, basic.users.clone());
        service.add_service_behavior(Arc::new(policy))?;
    }

    let mut base_uris: Vec<String> = config.endpoints.iter().map(|e| e.base_uri.clone()).collect();
    if let Some(addr) = addr {
        base_uris.push(format!("http://{addr}/"));
    }
    if base_uris.is_empty() {
        base_uris.push(format!("http://{DEFAULT_ADDR}/"));
    }

    for base_uri in base_uris {
        let mut endpoint = EndpointDescriptor::new(&base_uri, sample_contract());
        if config.log.trace_requests {
            endpoint = endpoint.with_behavior(Arc::new(TracingBehavior));
        }
        if let Some(binding) = &binding {
            endpoint = endpoint.with_binding(Arc::clone(binding));
        }
        service
            .add_service_endpoint(endpoint)
            .with_context(|| format!("registering endpoint {base_uri}"))?;
    }
    Ok(service)
}

/// Run a parsed command line.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { config, addr } => {
            let config = load_config(config.as_deref())?;
            let mut log_config = LogConfig::from_env();
            if let Some(level) = &config.log.level {
                log_config.log_level.clone_from(level);
            }
            let _log_guard = init_logging_with_config(&log_config)?;

            let binding: Arc<dyn EndpointBinding> = Arc::new(HttpBinding::new());
            let mut service = build_service(&config, addr.as_deref(), Some(binding))?;
            service.start().context("starting service")?;
            for endpoint in service.endpoints() {
                info!(base_uri = %endpoint.base_uri(), "Listening");
            }

            wait_for_shutdown()?;
            info!("Shutdown requested");
            service.stop();
            Ok(())
        }
        Commands::Routes { config } => {
            let config = load_config(config.as_deref())?;
            let service = build_service(&config, None, None)?;
            let stdout = std::io::stdout();
            print_routes(&service, &mut stdout.lock())?;
            Ok(())
        }
    }
}

/// Write one line per operation: method, template, generated pattern.
fn print_routes(service: &RestService, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "service {} ({:?})", service.name(), service.instancing())?;
    for endpoint in service.endpoints() {
        writeln!(out, "{} [{}]", endpoint.base_uri(), endpoint.contract_name())?;
        for operation in endpoint.operations() {
            writeln!(
                out,
                "  {:<7} {:<24} {:<12} {}",
                operation.method().as_str(),
                operation.route().template(),
                operation.name(),
                operation.route().pattern()
            )?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown() -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Signal received");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> anyhow::Result<()> {
    println!("Press Enter to stop");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(())
}

#[cfg(test)]
pub(super) fn render_routes(service: &RestService) -> String {
    let mut out = Vec::new();
    print_routes(service, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}
