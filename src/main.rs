//! LanShare server binary.
//!
//! Shares one local directory over the LAN: an HTML file browser with
//! uploads, direct and zipped downloads, an optional password gate, and a
//! small JSON API for an optional single-page frontend served from disk.

mod archive;
mod atomic;
mod auth;
mod classify;
mod config;
mod error;
mod etag;
mod files;
mod frontend;
mod http;
mod listing;
mod logging;
mod pages;
mod qr;
mod routes;
mod stats;
mod storage;
mod upload;

use axum::extract::connect_info::ConnectInfo;
use axum::http::Request;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, info_span, warn};

use crate::auth::AuthConfig;
use crate::config::{Args, ShareSettings};
use crate::frontend::FrontendBundle;
use crate::stats::DownloadStats;
use crate::storage::Storage;

shadow!(build);

/// Starts the LanShare server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let storage = Arc::new(Storage::open(&args.dir).await?);
    let root = storage.root_path().to_path_buf();

    let lan_host = match local_ip_address::local_ip() {
        Ok(ip) => ip.to_string(),
        Err(err) => {
            warn!(error = %err, "unable to detect LAN address");
            "localhost".to_string()
        }
    };
    let server_url = format!("http://{lan_host}:{}", args.port);

    let frontend = FrontendBundle::detect(&args.frontend_dir(&root)).await;
    let settings = Arc::new(ShareSettings::new(
        server_url.clone(),
        &args,
        frontend.is_some(),
    ));
    let auth_config = Arc::new(AuthConfig::new(args.password()));
    let stats = Arc::new(DownloadStats::new());

    info!(path = ?root, "sharing directory");
    match &frontend {
        Some(bundle) => info!(path = ?bundle.dir(), "serving frontend bundle"),
        None => info!("frontend bundle not found, serving built-in browser"),
    }
    if auth_config.is_open() {
        info!("no password set, anyone on the network can access the share");
    } else {
        info!("password protection enabled");
    }

    let app = routes::build_router(storage, auth_config, settings, stats, frontend).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let connect_ip = request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip());
                let client_ip = http::resolve_client_ip(request.headers(), connect_ip)
                    .map(|ip| ip.to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                info_span!(
                    env!("CARGO_CRATE_NAME"),
                    client_ip,
                    method = ?request.method(),
                    path = ?request.uri().path(),
                )
            })
            .on_request(DefaultOnRequest::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
    );

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let listener = TcpListener::bind(addr).await?;

    info!("🚀 Starting HTTP server at {}", addr);
    info!("Open {} on any device in the same network", server_url);
    if !args.no_qr {
        match qr::render_terminal(&server_url) {
            Some(code) => println!("\n{code}"),
            None => warn!("unable to render QR code"),
        }
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install signal handler");
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

    info!("Received termination signal shutting down");
}
