use clap::Parser;

use provisioner::config::Opts;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    provisioner::run(opts).await
}
