#[tokio::main]
pub async fn main() -> Result<(), anyhow::Error> {
    circulating_supply::start_server().await?;
    Ok(())
}
