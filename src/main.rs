use std::time::Duration;

use clap::Parser;
use studyhall::cli::{
    Args, build_config, init_logging, load_jwt_secret, open_database, parse_token_headers,
};
use studyhall::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(token_headers) = parse_token_headers(&args.access_header, &args.refresh_header)
    else {
        std::process::exit(1);
    };

    let storage_timeout = Duration::from_secs(args.storage_timeout_secs);
    let Some(db) = open_database(&args.database, storage_timeout).await else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let config = build_config(&args, db, jwt_secret, token_headers);
    init_cleanup(&config.db).await;

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
