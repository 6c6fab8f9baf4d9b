//! Handshake probe - connect, authenticate and report what was negotiated.
//!
//! Usage:
//!   cargo run --example handshake_probe -- localhost:5900
//!   cargo run --example handshake_probe -- --config client.toml
//!
//! The password, when needed, is taken from `RFB_PASSWORD`.

use rfb_client::{establish, init_logging, Config};
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1).map(String::as_str) {
        Some("--config") => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
            Config::from_file(path)?
        }
        Some(server) => {
            let (host, port) = parse_server_address(server)?;
            let mut builder = Config::builder().host(host).port(port);
            if let Ok(password) = env::var("RFB_PASSWORD") {
                builder = builder.password(password);
            }
            builder.build()?
        }
        None => {
            eprintln!("Usage: {} <host>[:<port>] | --config <file>", args[0]);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging.filter);
    info!(
        "Probing {}:{}",
        config.connection.host, config.connection.port
    );

    match establish(&config).await {
        Ok(conn) => {
            info!(
                "Handshake complete: RFB {}, security {}",
                conn.version, conn.security_type
            );
            Ok(())
        }
        Err(e) => {
            let kind = if e.is_retryable() { "retryable" } else { "fatal" };
            error!("Handshake failed ({}): {}", kind, e);
            Err(e.into())
        }
    }
}

fn parse_server_address(server: &str) -> anyhow::Result<(String, u16)> {
    if let Some((host, port_str)) = server.split_once(':') {
        let port = port_str.parse::<u16>()?;
        Ok((host.to_string(), port))
    } else {
        // Default VNC port
        Ok((server.to_string(), 5900))
    }
}
