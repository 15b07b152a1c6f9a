use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use sshfs_core::core::{Event, ManagerError, StatusPoller};
use sshfs_core::{ConnectionProfile, MountManager};
use tokio::sync::broadcast::error::RecvError;

use crate::app::{bootstrap, tool_missing_message};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "sshfs-manager", version, subcommand_required = true)]
pub struct Args {
    /// Directory holding connections.json and settings.json
    /// (default: ~/.config/sshfs-gui)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved connections and whether they are mounted
    List,
    /// Save a new connection
    Add {
        /// Unique connection name
        name: String,
        /// Remote host name or IP
        #[arg(long)]
        host: String,
        /// SSH port
        #[arg(long, default_value_t = 22)]
        port: u16,
        /// Remote user
        #[arg(long)]
        username: String,
        /// Path on the remote host
        #[arg(long, default_value = "/")]
        remote_path: String,
        /// Absolute local directory to mount onto
        #[arg(long)]
        mount_point: String,
        /// Private key passed as -o IdentityFile=...
        #[arg(long)]
        identity_file: Option<String>,
        /// Extra sshfs flags, e.g. "-o compression=yes"
        #[arg(long, allow_hyphen_values = true)]
        extra_options: Option<String>,
        /// Save the connection disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Delete a saved connection (must be unmounted)
    Remove { name: String },
    /// Mount a saved connection
    Mount { name: String },
    /// Unmount a saved connection
    Unmount {
        name: String,
        /// Lazy unmount even if the mount point is busy; unsaved remote
        /// writes may be lost
        #[arg(long)]
        force: bool,
    },
    /// Print the mount state of every connection
    Status,
    /// Poll mount state and print changes until Ctrl+C
    Watch,
}

pub async fn run_cli(args: Args) -> Result<(), ManagerError> {
    let ctx = bootstrap(args.config_dir.as_deref())?;
    if let Some(warning) = &ctx.load_warning {
        eprintln!("Warning: {warning}");
    }
    let manager = ctx.manager;

    match args.command {
        Command::List | Command::Status => {
            manager.refresh_now();
            print_table(&manager);
        }
        Command::Add {
            name,
            host,
            port,
            username,
            remote_path,
            mount_point,
            identity_file,
            extra_options,
            disabled,
        } => {
            let mut profile = ConnectionProfile::new(name, host, username, mount_point);
            profile.port = port;
            profile.remote_path = remote_path;
            profile.identity_file = identity_file;
            profile.extra_options = extra_options;
            profile.enabled = !disabled;
            let name = profile.name.trim().to_owned();
            manager.add_profile(profile)?;
            println!("Added connection: {name}");
        }
        Command::Remove { name } => {
            manager.remove_profile(&name)?;
            println!("Removed connection: {name}");
        }
        Command::Mount { name } => {
            if !manager.external_tool_available() {
                eprintln!("Warning: {}", tool_missing_message(&manager.mount_tool()));
            }
            manager.mount(&name).await?;
            println!("Mounted: {name}");
        }
        Command::Unmount { name, force } => {
            let result = if force {
                manager.force_unmount(&name).await
            } else {
                manager.unmount(&name).await
            };
            if let Err(ManagerError::Mount(e)) = &result {
                if !force && e.suggests_force() {
                    eprintln!("Hint: retry with --force to lazily unmount a busy mount point.");
                }
            }
            result?;
            println!("Unmounted: {name}");
        }
        Command::Watch => watch(manager, ctx.settings.poll_interval()).await,
    }
    Ok(())
}

fn print_table(manager: &MountManager) {
    let profiles = manager.profiles();
    if profiles.is_empty() {
        println!("No connections saved in {:?}", manager.store_path());
        return;
    }
    println!(
        "{:<16} {:<28} {:<20} {:<24} STATUS",
        "NAME", "HOST", "REMOTE PATH", "LOCAL MOUNT"
    );
    for p in profiles {
        let status = manager.status(&p.name);
        let mut state = if status.mounted { "Mounted" } else { "Not Mounted" }.to_owned();
        if !p.enabled {
            state.push_str(" (disabled)");
        }
        println!(
            "{:<16} {:<28} {:<20} {:<24} {}",
            p.name,
            p.host_label(),
            p.remote_path,
            p.local_mount_point,
            state
        );
    }
}

async fn watch(manager: MountManager, period: std::time::Duration) {
    let mut events = manager.subscribe();
    let poller = StatusPoller::spawn(manager.clone(), period);
    info!("Watching {} connection(s); Ctrl+C to stop", manager.profiles().len());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(Event::StatusChanged { name, status }) => {
                    let state = if status.mounted { "Mounted" } else { "Not Mounted" };
                    println!("{name}: {state}");
                }
                Ok(Event::ActionFailed { name, message, .. }) => {
                    println!("{name}: {message}");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => info!("Skipped {n} events"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    poller.stop().await;
}
