use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the config file (created with defaults if missing)
    #[clap(long, default_value = "shelf.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest one PDF, classifying it into a topic subdirectory
    AddPaper {
        /// Path to the PDF file
        path: PathBuf,

        /// Candidate topics, comma-separated (e.g. "biology,physics")
        #[clap(long)]
        topics: Option<String>,
    },

    /// Ingest every PDF in a folder; one bad file never aborts the rest
    BatchOrganize {
        /// Folder to scan (non-recursive)
        folder: PathBuf,

        /// Candidate topics, comma-separated
        #[clap(long)]
        topics: Option<String>,
    },

    /// Find papers matching a text query
    SearchPaper {
        /// Free-text query
        query: String,
    },

    /// Walk a directory tree and index every recognized image
    IndexImages {
        /// Root directory to scan
        path: PathBuf,
    },

    /// Find images matching a text query
    SearchImage {
        /// Free-text query
        query: String,
    },
}
