use clap::Parser;
use color_eyre::Result;
use serial_bridge::{cli, config::Config, logging, server};

use tracing::{debug, error, info, Level};

#[cfg(unix)]
async fn hangup() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    hangup.recv().await;

    Ok(())
}

#[cfg(not(unix))]
async fn hangup() -> std::io::Result<()> {
    std::future::pending().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if let Some(command) = cli.command {
        cli::handle_command(command);

        return Ok(());
    }

    let file_logging = cli.log_dir.map(|log_dir| (Level::DEBUG, log_dir));
    logging::init(Level::INFO, file_logging).await;

    let config = if let Some(config_path) = cli.config {
        debug!(?config_path, "Config from path");
        Config::new_from_path(config_path)
    } else {
        debug!("Default config");
        Config::default()
    };

    let port = config.port;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting")
        }
        _ = hangup() => {
            info!("Told to hang up, quitting")
        }
        result = server::run_on_port(config, port) => {
            error!("Server returned");
            result?;
            return Err(color_eyre::eyre::eyre!("Server stopped unexpectedly"));
        }
    }

    logging::shutdown();

    Ok(())
}
