#[tokio::main]
async fn main() {
    if let Err(e) = campus_gate::run_worker().await {
        eprintln!("pass-worker failed: {}", e);
        std::process::exit(1);
    }
}
