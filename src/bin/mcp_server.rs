//! Browser automation MCP server
//!
//! Serves the browser tools over stdio, SSE or streamable HTTP. Logs go to
//! stderr so they never mix with the stdio protocol stream.

use browser_use::browser::{ConnectionOptions, LaunchOptions};
use browser_use::config::ServerConfig;
use browser_use::frames::FrameTrackerConfig;
use browser_use::mcp::BrowserServer;
use clap::{Parser, ValueEnum};
use rmcp::transport::{
    sse_server::{SseServer, SseServerConfig},
    streamable_http_server::{StreamableHttpService, session::local::LocalSessionManager},
};
use rmcp::{ServiceExt, transport::stdio};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// Standard input/output transport (default)
    Stdio,
    /// Server-Sent Events transport
    Sse,
    /// HTTP streamable transport
    Http,
}

#[derive(Parser)]
#[command(name = "browser-use")]
#[command(version)]
#[command(about = "Browser automation MCP server", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<String>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<String>,

    /// Seconds between sweeps evicting detached frames (0 disables the sweep)
    #[arg(long, value_name = "SECS", default_value = "30")]
    frame_cleanup_interval_secs: u64,

    /// Milliseconds a frame liveness probe may take
    #[arg(long, value_name = "MS", default_value = "1000")]
    frame_probe_timeout_ms: u64,

    /// Node count above which diagnose flags a frame as large
    #[arg(long, value_name = "COUNT", default_value = "1000")]
    large_frame_elements: usize,

    /// Seconds without an update after which diagnose flags a frame as stale
    #[arg(long, value_name = "SECS", default_value = "600")]
    stale_frame_secs: u64,

    /// Transport type to use
    #[arg(long, short = 't', value_enum, default_value = "stdio")]
    transport: Transport,

    /// Port for SSE or HTTP transport (default: 3000)
    #[arg(long, short = 'p', default_value = "3000")]
    port: u16,

    /// SSE endpoint path (default: /sse)
    #[arg(long, default_value = "/sse")]
    sse_path: String,

    /// SSE POST path for messages (default: /message)
    #[arg(long, default_value = "/message")]
    sse_post_path: String,

    /// HTTP streamable endpoint path (default: /mcp)
    #[arg(long, default_value = "/mcp")]
    http_path: String,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let mut launch = LaunchOptions::new().headless(!self.headed);
        if let Some(path) = &self.executable_path {
            launch = launch.chrome_path(path);
        }
        if let Some(dir) = &self.user_data_dir {
            launch = launch.user_data_dir(dir);
        }

        let frames = FrameTrackerConfig::new()
            .cleanup_interval(Duration::from_secs(self.frame_cleanup_interval_secs))
            .probe_timeout(Duration::from_millis(self.frame_probe_timeout_ms))
            .large_frame_elements(self.large_frame_elements)
            .stale_frame_age(Duration::from_secs(self.stale_frame_secs));

        let mut config = ServerConfig::new().with_launch(launch).with_frames(frames);
        if let Some(endpoint) = &self.ws_endpoint {
            config = config.with_connection(ConnectionOptions::new(endpoint));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.server_config();

    log::info!("Browser-use MCP Server v{}", env!("CARGO_PKG_VERSION"));
    match &config.connection {
        Some(connection) => log::info!("Connecting to browser at {}", connection.ws_url),
        None => log::info!(
            "Launching {} browser",
            if config.launch.headless { "headless" } else { "headed" }
        ),
    }

    let engine = config.create_engine()?;

    match cli.transport {
        Transport::Stdio => {
            log::info!("Ready to accept MCP connections via stdio");
            let service = BrowserServer::with_engine(engine, &config);
            let server = service.clone().serve(stdio()).await?;
            let quit_reason = server.waiting().await?;
            log::info!("Server quit with reason: {:?}", quit_reason);
            if let Err(e) = service.shutdown().await {
                log::warn!("Shutdown incomplete: {}", e);
            }
        }
        Transport::Sse => {
            let bind_addr = format!("127.0.0.1:{}", cli.port);
            let sse_config = SseServerConfig {
                bind: bind_addr.parse()?,
                sse_path: cli.sse_path.clone(),
                post_path: cli.sse_post_path.clone(),
                ct: CancellationToken::new(),
                sse_keep_alive: None,
            };
            let (sse_server, router) = SseServer::new(sse_config);

            log::info!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.sse_path);

            // each connection drives its own page over the shared browser
            let _cancellation_token =
                sse_server.with_service(move || BrowserServer::with_engine(engine.clone(), &config));

            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            axum::serve(listener, router.into_make_service()).await?;
        }
        Transport::Http => {
            let bind_addr = format!("127.0.0.1:{}", cli.port);
            let service_factory =
                move || Ok::<_, std::io::Error>(BrowserServer::with_engine(engine.clone(), &config));

            let http_service = StreamableHttpService::new(
                service_factory,
                LocalSessionManager::default().into(),
                Default::default(),
            );
            let router = axum::Router::new().nest_service(&cli.http_path, http_service);

            log::info!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.http_path);

            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
