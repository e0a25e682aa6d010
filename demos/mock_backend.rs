//! Toy target for trying the proxy by hand.
//!
//! ```text
//! cargo run --example mock_backend -- --port 9001 --name t1
//! cargo run --example mock_backend -- --port 9002 --name t2 --delay-ms 3000
//! cargo run -- --target 127.0.0.1:9001 --target 127.0.0.1:9002
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::State, routing::any, Router};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
struct Args {
    #[arg(long, default_value_t = 9001)]
    port: u16,

    #[arg(long, default_value = "target")]
    name: String,

    /// Delay before every response, to emulate a slow target.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,
}

async fn handle(State(args): State<Args>) -> String {
    if args.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }
    format!("Hello from {}\n", args.name)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let app = Router::new()
        .route("/", any(handle))
        .route("/{*path}", any(handle))
        .with_state(args.clone());

    println!("{} listening on http://{} (delay {}ms)", args.name, addr, args.delay_ms);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
