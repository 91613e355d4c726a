// ABOUTME: Server binary for the Kinance authorization server
// ABOUTME: Loads configuration, wires backends and serves the HTTP API with graceful shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Kinance Auth Server Binary
//!
//! Starts password login, the OAuth 2.0 authorization server and Google sign-in.

use anyhow::{Context, Result};
use clap::Parser;
use kinance_auth_server::{
    config::ServerConfig, logging, resources::ServerResources, routes::build_router,
    store::create_token_store, users::create_user_repository,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kinance-auth-server")]
#[command(about = "Kinance authorization server - password login, OAuth2 grants and Google sign-in")]
pub struct Args {
    /// Override bind host
    #[arg(long)]
    host: Option<String>,

    /// Override HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    logging::init_from_env()?;
    info!("{}", config.summary());

    let users = create_user_repository(&config.database).await?;
    let token_store = create_token_store(&config.store).await?;
    info!(backend = token_store.backend_name(), "Token store ready");

    let bind_address = config.bind_address();
    let resources = Arc::new(
        ServerResources::builder()
            .with_config(Arc::new(config))
            .with_users(users)
            .with_token_store(token_store)
            .build()?,
    );
    if resources.config.google.is_configured() {
        info!("Google sign-in enabled");
    } else {
        warn!("Google sign-in disabled: GOOGLE_CLIENT_ID or GOOGLE_REDIRECT_URL unset");
    }

    let app = build_router(&resources);
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!(address = %bind_address, "Kinance auth server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Kinance auth server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
