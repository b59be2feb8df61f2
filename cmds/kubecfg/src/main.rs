use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kubecfg::{
	commands::{self, util::BrokenPipeGuard},
	telemetry,
};
use tracing::{error, Level};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

#[derive(Parser)]
#[command(name = "kubecfg")]
#[command(about = "Compare Kubernetes configuration against a live cluster", long_about = None)]
#[command(version = env!("KUBECFG_VERSION"))]
struct Cli {
	/// Log level (error, warn, info, debug, trace); overrides RUST_LOG
	#[arg(long, global = true)]
	log_level: Option<Level>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Differences between the configuration and the cluster
	Diff(commands::diff::DiffArgs),

	/// Expanded configuration as YAML or JSON
	Show(commands::show::ShowArgs),
}

fn run(command: Commands) -> Result<u8> {
	let stdout = BrokenPipeGuard::new(std::io::stdout().lock());

	match command {
		Commands::Diff(args) => {
			let exit_zero = args.exit_zero;
			let outcome = commands::diff::run(args, stdout)?;
			Ok(commands::diff::exit_code(outcome, exit_zero))
		}
		Commands::Show(args) => commands::show::run(args, stdout).map(|()| 0),
	}
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	if let Err(e) = telemetry::init(cli.log_level) {
		eprintln!("{e:#}");
		return ExitCode::FAILURE;
	}

	match run(cli.command) {
		Ok(code) => ExitCode::from(code),
		Err(e) => {
			error!("{e:#}");
			ExitCode::FAILURE
		}
	}
}
