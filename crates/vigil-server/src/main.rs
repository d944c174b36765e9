use clap::Parser;

mod app;
mod commands;
mod dispatcher;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "vigil.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    tracing::info!("Starting VIGIL sensor alert server with config: {}", args.config);

    let config = vigil_config::load(&args.config)?;
    app::App::new(config).run().await
}
