use clap::Parser;
use tracing_subscriber::EnvFilter;

use creative_wand::app::App;
use creative_wand::cli::Args;
use creative_wand::config::ClientConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("creative_wand=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::load(args.config.as_deref())?;
    let launch = args.launch_params()?;
    args.apply_to(&mut config, &launch);

    if !config.render.color {
        colored::control::set_override(false);
    }

    App::new(config, launch, args.code.clone())?.run().await?;

    Ok(())
}
