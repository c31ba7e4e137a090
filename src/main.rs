//! # media-organizer CLI
//!
//! Command-line interface for the media organizer.
//!
//! ## Usage
//! ```bash
//! media-organizer run --path /Volumes/Backup --library ~/Media
//! media-organizer run --path /Volumes/Backup --library ~/Media --execute
//! media-organizer prune --path /Volumes/Backup --library ~/Media
//! ```

mod cli;

fn main() {
    media_organizer::init_tracing();

    if let Err(e) = cli::run() {
        eprintln!("{} {}", console::style("error:").red().bold(), e);
        std::process::exit(1);
    }
}
