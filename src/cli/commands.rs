//! Command implementations for the hitstream CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::SearchSettings;
use crate::error::{HitstreamError, Result};
use crate::hit::Hit;
use crate::results::HitResults;
use crate::segment::SegmentRef;
use crate::segment::memory::{MemoryQuery, segments_from_texts};

/// Execute a CLI command.
pub fn execute_command(args: HitstreamArgs) -> Result<()> {
    match &args.command {
        Command::Search(search_args) => search_corpus(search_args.clone(), &args),
        Command::Count(count_args) => count_hits(count_args.clone(), &args),
    }
}

/// A loaded corpus with a prepared search.
struct PreparedSearch {
    segments: Vec<SegmentRef>,
    results: HitResults,
}

fn prepare(args: &CorpusArgs) -> Result<PreparedSearch> {
    let texts = load_corpus(&args.corpus)?;
    let borrowed: Vec<&str> = texts.iter().map(String::as_str).collect();
    let segments = segments_from_texts(&borrowed, args.segments);
    info!(
        "Loaded {} documents from {} into {} segments",
        texts.len(),
        args.corpus.display(),
        segments.len()
    );

    let query = MemoryQuery::parse(&args.query)?;
    debug!("Parsed query: {query:?}");
    let config = args.fetch_config();
    config.validate()?;
    let results = HitResults::new(&segments, Arc::new(query), SearchSettings::new(config))?;
    Ok(PreparedSearch { segments, results })
}

/// Read a corpus file: one document per line. Empty lines are kept so that
/// document ids match line numbers.
fn load_corpus(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Text of a hit with a global document id.
fn hit_text(segments: &[SegmentRef], hit: &Hit) -> Option<String> {
    let segment = segments.iter().rev().find(|s| s.doc_base() <= hit.doc)?;
    segment.text(hit.doc - segment.doc_base(), hit.start, hit.end)
}

/// Print a window of hits.
fn search_corpus(args: SearchArgs, cli_args: &HitstreamArgs) -> Result<()> {
    let start_time = Instant::now();
    let search = prepare(&args.corpus)?;

    let window = match search.results.window(args.first, args.count) {
        Ok(window) => window,
        Err(HitstreamError::InvalidOperation(_)) => {
            return Err(HitstreamError::invalid_operation(format!(
                "--first {} is past the last hit ({} hits)",
                args.first,
                search.results.size_so_far()
            )));
        }
        Err(e) => return Err(e),
    };

    let hits = window
        .hits()
        .iter()
        .enumerate()
        .map(|(i, hit)| HitRow {
            index: window.first() + i,
            doc: hit.doc,
            start: hit.start,
            end: hit.end,
            text: hit_text(&search.segments, &hit),
        })
        .collect();

    output_result(
        &SearchOutput {
            query: args.corpus.query.clone(),
            first: window.first(),
            hits,
            has_next: window.has_next(),
            hit_stats: search.results.results_stats(),
            doc_stats: search.results.docs_stats(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Fetch everything and print the statistics.
fn count_hits(args: CountArgs, cli_args: &HitstreamArgs) -> Result<()> {
    let start_time = Instant::now();
    let search = prepare(&args.corpus)?;
    let hits_stored = search.results.size()?;

    output_result(
        &CountOutput {
            query: args.corpus.query.clone(),
            hits_stored,
            hit_stats: search.results.results_stats(),
            doc_stats: search.results.docs_stats(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::memory::MemorySegment;

    #[test]
    fn test_hit_text() {
        let segments: Vec<SegmentRef> = vec![
            Arc::new(MemorySegment::from_texts("a", 0, &["the quick fox", "lazy dog"])),
            Arc::new(MemorySegment::from_texts("b", 2, &["a brown fox jumps"])),
        ];
        assert_eq!(
            hit_text(&segments, &Hit::new(0, 1, 3)).as_deref(),
            Some("quick fox")
        );
        assert_eq!(hit_text(&segments, &Hit::new(2, 2, 3)).as_deref(), Some("fox"));
        assert_eq!(hit_text(&segments, &Hit::new(2, 3, 9)), None);
    }

    #[test]
    fn test_prepare_and_count() {
        let path = std::env::temp_dir().join(format!("hitstream-{}.txt", uuid::Uuid::new_v4()));
        fs::write(&path, "the fox\n\nfox and fox\nno match\n").unwrap();

        let args = CorpusArgs {
            corpus: path.clone(),
            query: "Fox".to_string(),
            segments: 2,
            max_process: None,
            max_count: None,
            threads: Some(2),
        };
        let search = prepare(&args).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(search.segments.len(), 2);
        assert_eq!(search.results.size().unwrap(), 3);
        let docs: Vec<u32> = (0..3).map(|i| search.results.doc(i).unwrap()).collect();
        let mut sorted = docs.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 2, 2]);
    }

    #[test]
    fn test_missing_corpus() {
        assert!(matches!(
            load_corpus(Path::new("/nonexistent/hitstream/corpus.txt")),
            Err(HitstreamError::Io(_))
        ));
    }
}
