use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use formpilot_core::ActionEngine;
use formpilot_core::MotionEngine;
use formpilot_core::ProbeBridge;
use formpilot_core::ProbeClient;
use formpilot_core::StateStore;
use formpilot_injector::CommandQueue;
use formpilot_injector::CommandSink;
use formpilot_injector::EmergencyStop;
use formpilot_injector::InjectorLink;
use formpilot_injector::SerialSink;
use formpilot_server::AppState;
use formpilot_server::router;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "formpilot", version, about = "Form-filling coordinator for a USB HID injector")]
struct Cli {
    /// Serial device path of the injector. Wins over --detect when both are
    /// given.
    #[arg(long = "serial", env = "FORMPILOT_SERIAL")]
    serial: Option<String>,

    /// Auto-detect the injector by USB manufacturer substring.
    #[arg(long = "detect", env = "FORMPILOT_DETECT", default_value = "Adafruit")]
    detect: String,

    #[arg(long = "baud", default_value_t = 115_200)]
    baud: u32,

    /// Loopback port for the probe control plane.
    #[arg(long = "port", default_value_t = 8787)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();

    let stop = EmergencyStop::new();

    let serial_path = match cli.serial {
        Some(path) => path,
        None => InjectorLink::detect(&cli.detect)
            .with_context(|| format!("no --serial given and detection by {:?} failed", cli.detect))?,
    };
    let link = Arc::new(
        InjectorLink::open(&serial_path, cli.baud, stop.clone())
            .context("cannot open the injector serial device")?,
    );
    let (queue, _queue_task) = CommandQueue::spawn(Arc::clone(&link), stop.clone());
    let sink: Arc<dyn CommandSink> = Arc::new(SerialSink::new(link, queue));

    let state = Arc::new(StateStore::new());
    let bridge = Arc::new(ProbeBridge::new(Arc::clone(&state)));
    let engine = Arc::new(ActionEngine::new(
        Arc::clone(&state),
        Arc::clone(&bridge) as Arc<dyn ProbeClient>,
        Arc::clone(&sink),
        stop.clone(),
    ));
    let motion = Arc::new(MotionEngine::new(Arc::clone(&state), sink));
    let app = AppState::new(state, bridge, engine, motion);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!("control plane listening on {addr}");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown(stop))
        .await
        .context("control plane server failed")?;

    info!("shut down cleanly");
    Ok(())
}

/// Wait for ctrl-c, then trip the emergency stop so the injector pipeline
/// drains and any running sequence aborts before the server exits.
async fn shutdown(stop: EmergencyStop) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
    stop.trigger();
}
