use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod classify;
mod cli;
mod config;
mod embeddings;
mod extract;
mod library;
mod store;

use config::Config;
use library::{Library, Match, SearchOutcome};

/// Split a comma-separated topic list into trimmed, non-empty labels.
pub fn parse_topics(topics: String) -> Vec<String> {
    topics
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shelf=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    match args.command {
        cli::Command::AddPaper { path, topics } => {
            let topics = topics.map(parse_topics).unwrap_or_default();
            let mut library = Library::open(config)?;

            let placement = library.add_paper(&path, &topics)?;
            library.save()?;

            match &placement.topic {
                Some(topic) => println!(
                    "Filed '{}' under topic '{}' -> {}",
                    placement.filename,
                    topic,
                    placement.destination.display()
                ),
                None => println!(
                    "Filed '{}' -> {}",
                    placement.filename,
                    placement.destination.display()
                ),
            }
            Ok(())
        }

        cli::Command::BatchOrganize { folder, topics } => {
            let topics = topics.map(parse_topics).unwrap_or_default();
            let mut library = Library::open(config)?;

            let results = library.organize_folder(&folder, &topics)?;
            library.save()?;

            let mut ok = 0;
            for (path, result) in &results {
                match result {
                    Ok(placement) => {
                        ok += 1;
                        println!("ok   {} -> {}", path.display(), placement.destination.display());
                    }
                    Err(e) => println!("skip {} ({})", path.display(), e),
                }
            }
            println!("{}/{} papers ingested", ok, results.len());

            // Individual failures are reported above; only a process-level
            // failure (e.g. missing folder) exits non-zero.
            Ok(())
        }

        cli::Command::SearchPaper { query } => {
            let library = Library::open(config)?;

            match library.search_papers(&query)? {
                SearchOutcome::EmptyLibrary => println!("The paper library is empty."),
                SearchOutcome::NoMatch => println!("No relevant results."),
                SearchOutcome::Matches(matches) => print_matches(&matches, true),
            }
            Ok(())
        }

        cli::Command::IndexImages { path } => {
            let mut library = Library::open(config)?;

            let report = library.index_images(&path)?;
            library.save()?;

            println!("{} images indexed", report.indexed);
            if !report.skipped.is_empty() {
                println!("{} files skipped:", report.skipped.len());
                for (path, reason) in &report.skipped {
                    println!("  {} ({})", path.display(), reason);
                }
            }
            Ok(())
        }

        cli::Command::SearchImage { query } => {
            let library = Library::open(config)?;

            match library.search_images(&query)? {
                SearchOutcome::EmptyLibrary => println!("The image library is empty."),
                SearchOutcome::NoMatch => println!("No relevant results."),
                SearchOutcome::Matches(matches) => print_matches(&matches, false),
            }
            Ok(())
        }
    }
}

fn print_matches(matches: &[Match], with_filename: bool) {
    for (i, m) in matches.iter().enumerate() {
        if with_filename {
            println!("[{}] {} (distance {:.3})", i + 1, m.meta.filename, m.distance);
            println!("    path: {}", m.meta.path);
        } else {
            println!("[{}] {} (distance {:.3})", i + 1, m.meta.path, m.distance);
        }
    }
}
