//! `tiny <port>`: serves the current directory over HTTP/1.0

// the remaining dependencies belong to the library
#![allow(unused_crate_dependencies)]

use std::{path::PathBuf, process::ExitCode};

use clap::{error::ErrorKind, Parser};
use tiny_web::{ConfigListenAddr, Server, ServerConfig};

/// Minimal HTTP/1.0 server for static files and CGI programs
#[derive(Debug, Parser)]
#[command(name = "tiny", version)]
struct Cli {
    /// TCP port to listen on
    port: u16,

    /// Directory the request URIs are resolved against
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Capacity of the connection queue
    #[arg(long, default_value_t = tiny_web::QUEUE_CAPACITY_DEFAULT)]
    queue_capacity: usize,

    /// Hard maximum of worker threads
    #[arg(long, default_value_t = tiny_web::pool::MAX_WORKERS_DEFAULT)]
    max_workers: usize,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            eprintln!("usage: tiny <port>");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig {
        addr: ConfigListenAddr::from_port(cli.port),
        queue_capacity: cli.queue_capacity,
        max_workers: cli.max_workers,
        doc_root: cli.root,
        ..ServerConfig::default()
    };

    match Server::tiny(&config) {
        Ok(server) => {
            server.wait();
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("server start failed: {err}");
            ExitCode::FAILURE
        }
    }
}
