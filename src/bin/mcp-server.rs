//! Stdio MCP server exposing the built-in `echo`, `get_time` and `read_file`
//! tools.
//!
//! stdout carries the protocol, so logs go to stderr. Set `RUST_LOG` to
//! change the level and `LOG_FORMAT=json` for JSON lines.

use std::process::ExitCode;

use mcplite::{Server, tools};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().with_target(false).init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let server = match tools::register_all(Server::builder())
        .server_info("mcplite-server", env!("CARGO_PKG_VERSION"))
        .build()
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to build server");
            return ExitCode::FAILURE;
        }
    };

    match server.serve_stdio().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server error");
            ExitCode::FAILURE
        }
    }
}
