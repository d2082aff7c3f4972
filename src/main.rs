//! Portfolio Showcase - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = portfolio_showcase::run().await {
        tracing::error!("Server failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
