use clap::Parser;
use client_tui::config::{CliOverrides, ClientConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Play chess in the terminal, entering moves from the keyboard.
#[derive(Parser)]
#[command(name = "client-tui", about = "Terminal chess with keyboard move input")]
struct Cli {
    /// Starting position. Crazyhouse pockets go in brackets after the
    /// placement, e.g. `.../RNBQKBNR[Qn] w KQkq - 0 1`.
    #[arg(long)]
    fen: Option<String>,

    /// Play crazyhouse: captured pieces can be dropped back on the board.
    #[arg(long)]
    crazyhouse: bool,

    /// Initial time per side in seconds, 0 for no clock.
    #[arg(long)]
    clock_secs: Option<u64>,

    /// Seconds added after each ply.
    #[arg(long)]
    increment_secs: Option<u64>,

    /// Wait for confirmation (`y`) before playing a move.
    #[arg(long)]
    confirm_moves: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::resolve(CliOverrides {
        fen: cli.fen,
        crazyhouse: cli.crazyhouse,
        clock_secs: cli.clock_secs,
        increment_secs: cli.increment_secs,
        confirm_moves: cli.confirm_moves.then_some(true),
    });

    // The terminal belongs to the UI, so logs go to a file.
    std::fs::create_dir_all(&config.log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "client-tui");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(?config, "client starting up");

    client_tui::ui::run_app(config).await?;

    tracing::info!("client shutting down");
    Ok(())
}
