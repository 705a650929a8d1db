#[tokio::main]
async fn main() {
    if let Err(e) = campus_gate::run().await {
        eprintln!("campus-gate failed to start: {}", e);
        std::process::exit(1);
    }
}
