use clap::Parser;
use sshfs_core::utils::logging::init_logging;
use sshfs_manager::ui::gui::window;

/// Desktop window for managing SSHFS connections.
#[derive(Parser, Debug)]
#[command(name = "sshfs-manager-gui", version)]
struct Args {
    /// Directory holding connections.json and settings.json
    #[arg(long)]
    config_dir: Option<std::path::PathBuf>,
}

fn main() {
    init_logging();
    let args = Args::parse();
    match window::launch_gui(args.config_dir) {
        Ok(_) => println!("GUI closed gracefully."),
        Err(e) => {
            eprintln!("Failed to launch GUI: {e}");
            std::process::exit(1);
        }
    }
}
