use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    phc_cli::main_entry().await
}
