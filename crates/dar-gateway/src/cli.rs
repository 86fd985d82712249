//! Command line for the `dar` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Digital audio recorder.
#[derive(Parser)]
#[command(name = "dar")]
#[command(about = "Schedule and record internet radio programs")]
#[command(version)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.dar/dar.toml)
    #[arg(short, long, env = "DAR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Config profile layered over [default]
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Streamer entry in the config file
    #[arg(long, default_value = "vlc", global = true)]
    pub streamer: String,

    /// Debug level (0-3)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3), global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the recorder with its HTTP interface (default)
    Serve {
        /// Listen on all interfaces instead of the configured bind address
        #[arg(long)]
        public: bool,
    },

    /// List scheduled jobs
    List,

    /// Reconcile jobs with the programs in the config file
    Reload {
        /// Do not add jobs for new programs
        #[arg(long)]
        no_create: bool,

        /// Do not re-register already scheduled programs
        #[arg(long)]
        no_update: bool,

        /// Do not pause jobs for programs no longer in the config
        #[arg(long)]
        no_pause: bool,
    },

    /// Run the recorder without the HTTP interface
    Run {
        /// Seconds to run (until Ctrl-C if not given)
        #[arg(long)]
        time: Option<u64>,

        /// Do not wait for running captures when stopping
        #[arg(long)]
        nowait: bool,
    },

    /// Capture a stream to a file right now
    Record {
        /// Stream content type (e.g. audio/aacp)
        #[arg(long)]
        media_type: String,

        /// File or path name, without file type
        #[arg(long)]
        filebase: String,

        /// Seconds or [HH:]MM:SS
        #[arg(long)]
        duration: String,

        /// Add a timestamp to the file name
        #[arg(long)]
        add_ts: bool,

        /// Overwrite the file if it exists
        #[arg(long)]
        force: bool,

        /// Print the command instead of running it
        #[arg(long)]
        dryrun: bool,

        /// Stream URL
        url: String,
    },
}
