use clap::Parser;
use sshfs_core::utils::logging::init_logging;
use sshfs_manager::ui::cli::cli_commands;

#[tokio::main]
async fn main() {
    init_logging();
    let args = cli_commands::Args::parse();
    if let Err(e) = cli_commands::run_cli(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
