//! rlsift - include/exclude search over very large text files
//!
//! Indexes the file, runs one parallel search and prints the hits in file order.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rlsift::config::ViewerConfig;
use rlsift::search::{SearchCriteria, SearchEvent};
use rlsift::Session;
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("rlsift")
        .version(rlsift::VERSION)
        .about("Fast include/exclude keyword search for very large log files")
        .long_about(
            "rlsift indexes a text file once and searches it in parallel chunks. Lines must \
             contain the include keywords (all of them, or any with --any) and none of the \
             exclude keywords.",
        )
        .arg(
            Arg::new("file")
                .help("Path to the file to search")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("include")
                .short('i')
                .long("include")
                .help("Keyword a line must contain (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("exclude")
                .short('x')
                .long("exclude")
                .help("Keyword that rejects a line (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("case-sensitive")
                .short('s')
                .long("case-sensitive")
                .help("Match case exactly")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("whole-word")
                .short('w')
                .long("whole-word")
                .help("Only match whole words")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("regex")
                .short('e')
                .long("regex")
                .help("Treat keywords as regular expressions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("any")
                .long("any")
                .help("A line needs only one include keyword instead of all")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("limit")
                .short('n')
                .long("limit")
                .help("Stop after this many hits")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("sample")
                .long("sample")
                .help("Scan only this fraction of the file, in (0, 1]")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("workers")
                .short('j')
                .long("workers")
                .help("Number of search workers")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .help("Write matching lines and a search summary into this directory")
                .value_parser(value_parser!(PathBuf)),
        )
}

fn criteria_from(matches: &ArgMatches) -> SearchCriteria {
    let keywords = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };

    SearchCriteria::new()
        .include(keywords("include"))
        .exclude(keywords("exclude"))
        .case_sensitive(matches.get_flag("case-sensitive"))
        .whole_word(matches.get_flag("whole-word"))
        .regex(matches.get_flag("regex"))
        .require_all_includes(!matches.get_flag("any"))
        .result_cap(matches.get_one::<usize>("limit").copied())
        .sampling_ratio(matches.get_one::<f64>("sample").copied())
}

#[cfg(feature = "config")]
fn load_config() -> Result<ViewerConfig> {
    Ok(ViewerConfig::load_or_default()?)
}

#[cfg(not(feature = "config"))]
fn load_config() -> Result<ViewerConfig> {
    Ok(ViewerConfig::default())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = cli().get_matches();
    let file_path = matches
        .get_one::<PathBuf>("file")
        .cloned()
        .context("file argument is required")?;

    let mut config = load_config()?;
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.search.workers = *workers;
    }

    let criteria = criteria_from(&matches);
    let session = Session::open_async(&file_path, &config)
        .await
        .with_context(|| format!("Failed to open {}", file_path.display()))?;

    let mut handle = session.search(criteria.clone()).await?;
    let terminal = loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) if event.is_terminal() => break event,
                Some(_) => continue,
                None => anyhow::bail!("search ended without a result"),
            },
            _ = tokio::signal::ctrl_c() => handle.cancel(),
        }
    };

    match terminal {
        SearchEvent::Finished(summary) => {
            for hit in session.results().snapshot() {
                println!(
                    "{}:{}: {}",
                    hit.line_number + 1,
                    hit.column_start + 1,
                    hit.line_content
                );
            }
            eprintln!(
                "{} hits in {}/{} chunks ({:.2?}){}",
                summary.total_hits,
                summary.completed_units,
                summary.total_units,
                summary.elapsed,
                if summary.cap_reached {
                    ", limit reached"
                } else {
                    ""
                }
            );
        }
        SearchEvent::Cancelled(summary) => {
            eprintln!("Search cancelled after {} hits", summary.total_hits);
        }
        SearchEvent::Failed { message } => anyhow::bail!("Search failed: {}", message),
        other => anyhow::bail!("unexpected search event: {:?}", other),
    }

    if let Some(dir) = matches.get_one::<PathBuf>("export") {
        let name = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rlsift".to_string());
        let report = session.export(&criteria, dir, &name)?;
        eprintln!(
            "Exported {} lines to {}",
            report.matched_lines,
            report.result_path.display()
        );
    }

    session.close().await;
    Ok(())
}
