use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tunes::cli::run_cli().await
}
