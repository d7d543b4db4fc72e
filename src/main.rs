use clap::{Parser, Subcommand};
use sr_router::capture::{AfPacketSocket, SocketTransport};
use sr_router::config;
use sr_router::dataplane::{Router, Sweeper};
use sr_router::telemetry::{init_logging, MetricsRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Large enough for offloaded frames the kernel may hand us
const RECV_BUFFER_SIZE: usize = 65536;

#[derive(Parser)]
#[command(name = "sr-router")]
#[command(about = "A static IPv4 software router")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the router daemon
    Run {
        /// Path to router.toml
        #[arg(short, long, default_value = "router.toml")]
        config: PathBuf,
    },
    /// Validate router.toml without starting the router
    Validate {
        /// Path to router.toml
        #[arg(short, long, default_value = "router.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config } => cmd_run(&config),
        Commands::Validate { config } => cmd_validate(&config),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(config_path: &Path) -> Result<(), String> {
    use tokio::runtime::Runtime;

    let cfg = config::load(config_path).map_err(|e| format!("Failed to load config: {}", e))?;

    // RUST_LOG still takes priority
    init_logging(Some(&cfg.logging));
    info!("Loaded {}", config_path.display());

    let validation = config::validate(&cfg);
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if validation.has_errors() {
        for err in &validation.errors {
            error!("{}", err);
        }
        return Err("Validation failed".to_string());
    }

    let interfaces = config::interface_table(&cfg, config::sysfs_mac)
        .map_err(|e| format!("Failed to resolve interfaces: {}", e))?;
    let routes = cfg.routing_table();

    let rt = Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;

    rt.block_on(async move {
        let mut transport = SocketTransport::new();
        let mut sockets = Vec::new();

        for iface in interfaces.iter() {
            info!("Binding to interface {}...", iface.name);
            let socket = AfPacketSocket::bind(&iface.name).map_err(|e| {
                format!(
                    "Failed to bind to {}: {}. Run with root privileges.",
                    iface.name, e
                )
            })?;
            let socket = Arc::new(socket);
            transport.insert(iface.name.as_str(), Arc::clone(&socket));
            sockets.push(socket);
            info!("  {} configured: MAC={}, IP={}", iface.name, iface.mac, iface.ip);
        }

        for route in routes.routes() {
            debug!(
                "Route {}/{} via {} dev {}",
                route.destination,
                route.prefix_len(),
                route.gateway,
                route.interface
            );
        }

        let metrics = Arc::new(MetricsRegistry::new());
        let router = Arc::new(Router::new(
            interfaces,
            routes,
            cfg.router.cache_config(),
            Arc::new(transport),
            Arc::clone(&metrics),
        ));

        let sweeper = Sweeper::spawn(Arc::clone(&router), cfg.router.sweep_period());
        let receivers: Vec<_> = sockets
            .into_iter()
            .map(|socket| tokio::spawn(receive_loop(Arc::clone(&router), socket)))
            .collect();

        info!("Router started, processing packets...");

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for Ctrl-C: {}", e))?;

        info!("Shutting down");
        for receiver in &receivers {
            receiver.abort();
        }
        sweeper.shutdown().await;

        for (key, value) in metrics.export() {
            info!("{} = {}", key, value);
        }
        Ok(())
    })
}

async fn receive_loop(router: Arc<Router>, socket: Arc<AfPacketSocket>) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        match socket.recv(&mut buf).await {
            Ok(len) => router.handle_frame(&buf[..len], socket.name()),
            Err(e) => {
                error!("Receive error on {}: {}", socket.name(), e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

fn cmd_validate(config_path: &Path) -> Result<(), String> {
    init_logging(None);
    println!("[INFO] Validating {}...", config_path.display());

    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        Err("Validation failed".to_string())
    } else {
        println!(
            "[INFO] Configuration is valid: {} interfaces, {} routes",
            cfg.interfaces.len(),
            cfg.routes.len()
        );
        Ok(())
    }
}
