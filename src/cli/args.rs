//! Command line argument parsing for the hitstream CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::FetchConfig;

/// Hitstream - lazy, bounded hit retrieval over a text corpus
#[derive(Parser, Debug, Clone)]
#[command(name = "hitstream")]
#[command(about = "Search a text corpus and page through its hits")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct HitstreamArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl HitstreamArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print a window of hits
    Search(SearchArgs),

    /// Count hits without printing them
    Count(CountArgs),
}

/// Corpus and limits shared by all commands.
#[derive(Parser, Debug, Clone)]
pub struct CorpusArgs {
    /// Text file with one document per line
    #[arg(value_name = "CORPUS_FILE")]
    pub corpus: PathBuf,

    /// Query: one word for a term query, several for a phrase
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Number of segments to split the corpus into
    #[arg(short, long, default_value = "4")]
    pub segments: usize,

    /// Maximum number of hits to store
    #[arg(long, env = "HITSTREAM_MAX_PROCESS")]
    pub max_process: Option<u64>,

    /// Maximum number of hits to count
    #[arg(long, env = "HITSTREAM_MAX_COUNT")]
    pub max_count: Option<u64>,

    /// Maximum number of fetch threads (default: number of CPUs)
    #[arg(short, long)]
    pub threads: Option<usize>,
}

impl CorpusArgs {
    /// Fetch config for these arguments. With only a counting ceiling, the
    /// storing ceiling is set to the same value.
    pub fn fetch_config(&self) -> FetchConfig {
        let max_process = self.max_process.or(self.max_count);
        let config = FetchConfig::new(max_process, self.max_count);
        match self.threads {
            Some(threads) => config.with_max_threads(threads),
            None => config,
        }
    }
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Index of the first hit to print
    #[arg(long, default_value = "0")]
    pub first: usize,

    /// Number of hits to print
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,
}

/// Arguments for counting
#[derive(Parser, Debug, Clone)]
pub struct CountArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_args() {
        let args = HitstreamArgs::try_parse_from([
            "hitstream",
            "search",
            "corpus.txt",
            "quick fox",
            "--segments",
            "3",
            "--max-process",
            "10",
            "--first",
            "5",
            "-n",
            "2",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 1);
        if let Command::Search(search) = args.command {
            assert_eq!(search.corpus.corpus, PathBuf::from("corpus.txt"));
            assert_eq!(search.corpus.query, "quick fox");
            assert_eq!(search.corpus.segments, 3);
            assert_eq!(search.corpus.max_process, Some(10));
            assert_eq!(search.first, 5);
            assert_eq!(search.count, 2);
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_verbosity() {
        let args = HitstreamArgs::try_parse_from(["hitstream", "-vvv", "count", "c.txt", "q"])
            .unwrap();
        assert_eq!(args.verbosity(), 3);

        let args =
            HitstreamArgs::try_parse_from(["hitstream", "-v", "-q", "count", "c.txt", "q"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            HitstreamArgs::try_parse_from(["hitstream", "--format", "json", "count", "c.txt", "q"])
                .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_fetch_config() {
        let args = HitstreamArgs::try_parse_from([
            "hitstream",
            "count",
            "c.txt",
            "q",
            "--max-count",
            "100",
            "--threads",
            "2",
        ])
        .unwrap();

        if let Command::Count(count) = args.command {
            let config = count.corpus.fetch_config();
            assert_eq!(config.max_hits_to_process, Some(100));
            assert_eq!(config.max_hits_to_count, Some(100));
            assert_eq!(config.max_threads_per_search, 2);
        } else {
            panic!("Expected Count command");
        }
    }
}
