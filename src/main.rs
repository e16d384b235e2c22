#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kanndeutsch::run().await
}
