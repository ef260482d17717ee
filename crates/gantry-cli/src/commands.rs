//! CLI command definitions.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Queue jobs for a patchset
    Enqueue {
        /// Change identifier
        change: String,

        /// Revision number
        revision: u32,

        /// Job names to queue (defaults to every known job)
        #[arg(short, long)]
        job: Vec<String>,

        /// Mark this as a recheck-triggered run
        #[arg(long)]
        recheck: bool,
    },

    /// Claim and run queued work until the queue drains
    Work {
        /// Worker configuration file
        #[arg(short, long, default_value = "gantry-worker.yaml")]
        config: PathBuf,

        /// Run at most one work item, then exit
        #[arg(long)]
        once: bool,
    },

    /// Publish reports for completed work items
    Publish,

    /// Send notifications for fully completed patchsets
    Notify,

    /// Regenerate the status dashboard
    Dashboard {
        /// Number of recent patchsets to include
        #[arg(short, long)]
        limit: Option<u32>,

        /// Write the page here instead of <artifact root>/index.html
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply database migrations
    Migrate,
}
