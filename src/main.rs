#[tokio::main]
async fn main() {
    match snapflow_cli::cli::app::run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
