#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mindhome_lib::run().await
}
