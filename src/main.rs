#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rosterly_lib::run().await
}
