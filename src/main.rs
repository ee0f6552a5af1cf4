// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Portfolio Gate Service
//!
//! Serves the portfolio behind an access token and relays the contact form.
//!
//! ## Configuration
//!
//! Loaded from `.env`, an optional `portfolio-gate.toml` (or the file named by
//! `PORTFOLIO_CONFIG`) and `PORTFOLIO_*` variables, e.g.:
//!
//! - `PORTFOLIO_BIND_ADDR`: Server bind address (default: 0.0.0.0:3000)
//! - `PORTFOLIO_ENVIRONMENT`: `development` or `production`
//! - `PORTFOLIO_ACCESS__SEED_TOKENS`: Comma-separated tokens valid at startup
//! - `PORTFOLIO_RATE_LIMIT__WINDOW_MS`: Contact cooldown (default: 12h)
//! - `PORTFOLIO_PUBLIC_URL`: Base of the printed access links; without it
//!   the links use this host's LAN address so a phone on the same network
//!   can open them
//! - `PORT`, `EMAIL_USER`, `EMAIL_PASSWORD`: shorthand overrides

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portfolio_gate::{
    config::Config,
    handlers::{router, AppState},
    mailer::{Mailer, SmtpMailer, UnconfiguredMailer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::load()?;
    info!(
        bind_addr = %config.bind_addr,
        environment = ?config.environment,
        window_ms = config.rate_limit.window_ms,
        advisory_window_ms = config.rate_limit.advisory_window_ms,
        static_root = %config.static_files.root,
        "Starting portfolio gate"
    );

    let mailer: Arc<dyn Mailer> = match SmtpMailer::new(&config.mail) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            error!(error = %e, "Mail settings unusable, contact form will fail");
            Arc::new(UnconfiguredMailer::new(e.to_string()))
        }
    };
    verify_mailer(mailer.clone(), &config);

    let state = AppState::new(config.clone(), mailer).await?;

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_state.config.rate_limit.cleanup_interval());
        loop {
            interval.tick().await;
            cleanup_state.limiter().cleanup().await;
        }
    });

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    announce_access_links(&state, addr).await;

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Check the SMTP connection in the background; a failure is only logged.
fn verify_mailer(mailer: Arc<dyn Mailer>, config: &Config) {
    let host = config.mail.host.clone();
    let port = config.mail.port;
    let user = config.mail.username.clone();
    tokio::spawn(async move {
        match mailer.verify().await {
            Ok(true) => info!(%host, port, "Mail server is ready to send messages"),
            Ok(false) => warn!(%host, port, %user, "Mail server rejected the connection test"),
            Err(e) => error!(%host, port, %user, error = %e, "Mail configuration error"),
        }
    });
}

/// Issue desktop and mobile tokens and log the links that redeem them.
async fn announce_access_links(state: &AppState, addr: SocketAddr) {
    let desktop = state.tokens.issue().await;
    let mobile = state.tokens.issue().await;
    // Startup tokens are pinned like configured seeds
    state.tokens.insert_seed(desktop.as_str()).await;
    state.tokens.insert_seed(mobile.as_str()).await;

    let lan = match state.config.public_url {
        Some(_) => None,
        None => lan_ipv4().await,
    };
    if state.config.public_url.is_none() && lan.is_none() {
        warn!("No LAN address found, set PORTFOLIO_PUBLIC_URL for links other devices can open");
    }
    let base = state.config.access_base_url(lan, addr.port());

    info!(url = %format!("{base}/access?token={desktop}"), token = %desktop, "Desktop access");
    info!(
        url = %format!("{base}/mobile"),
        alternate_url = %format!("{base}/access?token={mobile}"),
        token = %mobile,
        "Mobile access"
    );
}

/// The IPv4 address outbound traffic would leave from.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
async fn lan_ipv4() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80)).await.ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
