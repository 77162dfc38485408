use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bitrix_mcp::config::{self, BitrixConfig, ConfigError, McpConfig, TransportKind};
use bitrix_mcp::mcp;
use bitrix_mcp::tools::AppContext;

#[derive(Parser)]
#[command(name = "bitrix-mcp")]
#[command(about = "Bitrix24 CRM, tasks, calendar and workgroups as MCP tools")]
#[command(version)]
struct Cli {
    /// Transport to serve: stdio or streamable-http
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Host for the streamable HTTP transport
    #[arg(long)]
    host: Option<String>,

    /// Port for the streamable HTTP transport
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Read hosting settings, skipping any variable a flag replaces so a bad
    /// value there is never parsed.
    fn mcp_config(self, env: impl Fn(&str) -> Option<String>) -> Result<McpConfig, ConfigError> {
        let mut config = McpConfig::from_lookup(|key| {
            if self.overrides(key) {
                None
            } else {
                env(key)
            }
        })?;
        self.apply(&mut config);
        Ok(config)
    }

    fn overrides(&self, key: &str) -> bool {
        match key {
            "MCP_TRANSPORT" => self.transport.is_some(),
            "MCP_HOST" => self.host.is_some(),
            "MCP_PORT" => self.port.is_some(),
            "MCP_LOG_LEVEL" => self.log_level.is_some(),
            _ => false,
        }
    }

    /// Command-line flags override environment settings.
    fn apply(self, config: &mut McpConfig) {
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = self.log_level {
            config.log_level = level.to_ascii_lowercase();
        }
    }
}

/// Initialize tracing with output to stderr (for stdio mode) or stdout
fn init_tracing(level: &str, use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| format!("bitrix_mcp={},tower_http={}", level, level)),
    );

    if use_stderr {
        // stdout carries the protocol
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let dotenv = config::load_dotenv();
    let mcp_config = cli.mcp_config(|key| std::env::var(key).ok())?;

    init_tracing(
        &mcp_config.log_level,
        mcp_config.transport == TransportKind::Stdio,
    );

    match dotenv {
        Ok(Some(path)) => tracing::debug!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    let bitrix_config = BitrixConfig::from_env()?;
    tracing::debug!("Bitrix24 settings: {:?}", bitrix_config);

    tracing::info!("Initializing Bitrix24 MCP server");
    let context = Arc::new(AppContext::connect(&bitrix_config)?);

    match mcp_config.transport {
        TransportKind::Stdio => mcp::run_stdio_server(context.clone(), &mcp_config).await?,
        TransportKind::StreamableHttp => {
            mcp::run_http_server(context.clone(), &mcp_config).await?
        }
    }

    if let Ok(context) = Arc::try_unwrap(context) {
        context.shutdown();
    }

    Ok(())
}
