//! Saving a filtered view of the file.
//!
//! An export is two plain-text files: `<name>_result.txt` holds every matching line once,
//! in file order, and `<name>_info.txt` records the criteria and counts that produced it.

use crate::error::{Result, RlsiftError};
use crate::search::{ResultStore, SearchCriteria};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Files written by [`export_results`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub result_path: PathBuf,
    pub info_path: PathBuf,
    pub matched_lines: usize,
    pub total_hits: usize,
}

/// Write the current contents of `results` into `out_dir`, creating it if needed
pub fn export_results(
    results: &ResultStore,
    criteria: &SearchCriteria,
    total_lines: u64,
    out_dir: &Path,
    name: &str,
) -> Result<ExportReport> {
    fs::create_dir_all(out_dir).map_err(|e| {
        RlsiftError::file_error(
            format!("Failed to create export directory: {}", out_dir.display()),
            e,
        )
    })?;

    let hits = results.snapshot();
    let result_path = out_dir.join(format!("{}_result.txt", name));
    let info_path = out_dir.join(format!("{}_info.txt", name));

    let mut matched_lines = 0;
    let mut out = create(&result_path)?;
    let mut previous_line = None;
    for hit in &hits {
        if previous_line == Some(hit.line_number) {
            continue;
        }
        previous_line = Some(hit.line_number);
        matched_lines += 1;
        writeln!(out, "{}", hit.line_content).map_err(|e| write_error(&result_path, e))?;
    }
    out.flush().map_err(|e| write_error(&result_path, e))?;

    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    let mut info = create(&info_path)?;
    let summary = format!(
        "Search: {}\n\
         Include: {}\n\
         Exclude: {}\n\
         Case sensitive: {}\n\
         Whole word: {}\n\
         Regex: {}\n\
         Include logic: {}\n\
         Hits: {}\n\
         Matched lines: {}\n\
         Total lines: {}\n",
        criteria.describe(),
        criteria.effective_include().collect::<Vec<_>>().join(", "),
        criteria.effective_exclude().collect::<Vec<_>>().join(", "),
        yes_no(criteria.case_sensitive),
        yes_no(criteria.whole_word),
        yes_no(criteria.regex),
        if criteria.require_all_includes {
            "AND"
        } else {
            "OR"
        },
        hits.len(),
        matched_lines,
        total_lines,
    );
    info.write_all(summary.as_bytes())
        .and_then(|_| info.flush())
        .map_err(|e| write_error(&info_path, e))?;

    log::info!(
        "exported {} lines to {}",
        matched_lines,
        result_path.display()
    );

    Ok(ExportReport {
        result_path,
        info_path,
        matched_lines,
        total_hits: hits.len(),
    })
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| RlsiftError::file_error(format!("Failed to create {}", path.display()), e))
}

fn write_error(path: &Path, e: std::io::Error) -> RlsiftError {
    RlsiftError::file_error(format!("Failed to write {}", path.display()), e)
}
