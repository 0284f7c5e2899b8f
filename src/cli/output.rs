//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{HitstreamArgs, OutputFormat};
use crate::error::Result;
use crate::stats::ResultsStatsSnapshot;

/// One printed hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitRow {
    pub index: usize,
    pub doc: u32,
    pub start: u32,
    pub end: u32,
    pub text: Option<String>,
}

/// Result structure for the search command.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    pub query: String,
    pub first: usize,
    pub hits: Vec<HitRow>,
    pub has_next: bool,
    pub hit_stats: ResultsStatsSnapshot,
    pub doc_stats: ResultsStatsSnapshot,
    pub duration_ms: u64,
}

/// Result structure for the count command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountOutput {
    pub query: String,
    pub hits_stored: usize,
    pub hit_stats: ResultsStatsSnapshot,
    pub doc_stats: ResultsStatsSnapshot,
    pub duration_ms: u64,
}

/// Something a command can print for people.
pub trait HumanOutput {
    fn print_human(&self, args: &HitstreamArgs);
}

impl HumanOutput for SearchOutput {
    fn print_human(&self, args: &HitstreamArgs) {
        println!("Hits for \"{}\":", self.query);
        println!("═══════════════");
        if self.hits.is_empty() {
            println!("(none)");
        }
        for row in &self.hits {
            println!(
                "{:>6}  doc {:<6} [{}, {})  {}",
                row.index,
                row.doc,
                row.start,
                row.end,
                row.text.as_deref().unwrap_or("")
            );
        }
        if self.has_next {
            println!("...");
        }
        println!();
        print_stats(&self.hit_stats, &self.doc_stats);
        if args.verbosity() > 1 {
            println!("Search time: {}ms", self.duration_ms);
        }
    }
}

impl HumanOutput for CountOutput {
    fn print_human(&self, args: &HitstreamArgs) {
        println!("Hits for \"{}\":", self.query);
        println!("═══════════════");
        println!("Stored: {}", self.hits_stored);
        print_stats(&self.hit_stats, &self.doc_stats);
        if args.verbosity() > 1 {
            println!("Search time: {}ms", self.duration_ms);
        }
    }
}

fn print_stats(hits: &ResultsStatsSnapshot, docs: &ResultsStatsSnapshot) {
    println!(
        "Hits: {} processed, {} counted{}",
        hits.processed_so_far,
        hits.counted_so_far,
        ceiling_note(hits)
    );
    println!(
        "Docs: {} processed, {} counted",
        docs.processed_so_far, docs.counted_so_far
    );
}

fn ceiling_note(stats: &ResultsStatsSnapshot) -> &'static str {
    match (
        stats.ceiling_on_processing_exceeded,
        stats.ceiling_on_counting_exceeded,
    ) {
        (_, true) => " (counting limit reached)",
        (true, false) => " (processing limit reached)",
        (false, false) => "",
    }
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(result: &T, args: &HitstreamArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            result.print_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &HitstreamArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}
