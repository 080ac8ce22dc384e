mod doctor;
mod executor;
mod extend;
mod lvm;
mod privileges;
mod status;

use clap::{Parser, Subcommand};

/// Grow the root LVM logical volume to fill its volume group
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extend the root logical volume and the filesystem on it
    Extend {
        /// Target logical volume (defaults to the device backing /)
        #[arg(long)]
        device: Option<String>,

        /// Capacity to leave unallocated, e.g. "4M", "4096K" or plain bytes
        #[arg(long, default_value = "4M")]
        margin: String,

        /// Print the mutating commands instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Emit phase events and the result as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show the volume group layout and computed headroom
    Status {
        /// Target logical volume (defaults to the device backing /)
        #[arg(long)]
        device: Option<String>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the host has everything an extend run needs
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug {
        eprintln!("Debug mode is on");
    }

    let result = match cli.command {
        Commands::Extend {
            device,
            margin,
            dry_run,
            json,
        } => extend::run_extend(device, &margin, dry_run, json),
        Commands::Status { device, json } => status::run_status(device, json),
        Commands::Doctor => doctor::run_doctor().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
