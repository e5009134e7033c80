use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "dubview",
    version,
    about = "Browse and play the dubbindo.site catalog from the terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Remote-control style browser (default).
    Tui,
    /// Print one page of search results, naturally sorted.
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the playable sources of a title page.
    Streams {
        link: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the stored watch history.
    History,
}
