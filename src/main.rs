use archestra_provider::{init_logging, serve, ArchestraProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Archestra provider");
    serve(ArchestraProvider::new()).await
}
