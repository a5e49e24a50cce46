use clap::{Parser, Subcommand};
use index_marker_sync::sync::{StatePersistenceService, SyncConfig, SyncProgressTracker};
use index_marker_sync::utils::format_ranges;
use index_marker_sync::{IndexMarker, IndexSelection, SyncError};
use std::path::PathBuf;
use tracing::{error, info};

/// Inspect and edit a persisted index marker
#[derive(Debug, Parser)]
#[command(name = "index-marker-sync", version, about)]
struct Cli {
	/// Directory holding marker state files
	#[arg(long, default_value = "./marker-data")]
	data_dir: PathBuf,

	/// Name of the marker to operate on
	#[arg(long, default_value = "wallet")]
	name: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Mark an index, a comma separated set, or an inclusive range such as 10-20
	Mark { selection: IndexSelection },
	/// Unmark an index, a comma separated set, or an inclusive range
	Unmark { selection: IndexSelection },
	/// Swap marked and unmarked status across every index
	Invert,
	/// Clear all markings
	Reset,
	/// Report whether a selection is all, none or partially marked
	Status { selection: IndexSelection },
	/// List unmarked runs inside an inclusive window
	Gaps { start: u64, end: u64 },
	/// List the unprocessed sub-ranges of an inclusive window, checked batch by batch
	Pending {
		start: u64,
		end: u64,
		#[arg(long, default_value_t = SyncConfig::default().batch_size)]
		batch_size: u64,
	},
	/// Show the first marked and first unmarked index
	Next {
		#[arg(long, default_value_t = 0)]
		from: u64,
	},
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let cli = Cli::parse();

	if let Err(e) = run(cli).await {
		error!("Command failed: {}", e);
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> Result<(), SyncError> {
	let persistence = StatePersistenceService::new(cli.data_dir.clone());

	let mut marker = match persistence.restore_marker(&cli.name).await? {
		Some((marker, _)) => marker,
		None => {
			info!("No saved marker {:?} in {:?}, starting empty", cli.name, cli.data_dir);
			IndexMarker::new()
		}
	};

	let mutated = match &cli.command {
		Command::Mark { selection } => {
			marker.mark_selection(selection)?;
			true
		}
		Command::Unmark { selection } => {
			marker.unmark_selection(selection)?;
			true
		}
		Command::Invert => {
			marker.invert();
			true
		}
		Command::Reset => {
			marker.reset();
			true
		}
		Command::Status { selection } => {
			let status = marker.selection_status(selection)?;
			println!("{}", status);
			false
		}
		Command::Gaps { start, end } => {
			let gaps = marker.unmarked_ranges(*start, *end)?;
			println!("{}", format_ranges(&gaps));
			false
		}
		Command::Pending {
			start,
			end,
			batch_size,
		} => {
			let config = SyncConfig {
				start_index: *start,
				batch_size: *batch_size,
				..SyncConfig::default()
			};
			let tracker = SyncProgressTracker::from_config(&config, marker.detached())?;
			println!("{}", format_ranges(&tracker.pending(*start, *end)?));
			false
		}
		Command::Next { from } => {
			let show = |index: Option<u64>| index.map_or_else(|| "none".to_string(), |i| i.to_string());
			println!("first marked:   {}", show(marker.first_marked(*from)));
			println!("first unmarked: {}", show(marker.first_unmarked(*from)));
			false
		}
	};

	if mutated {
		let height = marker.last_marked().unwrap_or(0);
		persistence
			.save_marker(&cli.name, &marker.snapshot(), height)
			.await?;
	}

	Ok(())
}
