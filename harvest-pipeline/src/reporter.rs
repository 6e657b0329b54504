//! Reloads collected CSVs and summarises them.
//!
//! [`describe_file`] covers a single per-forum file; [`analyze_file`] is the
//! second pass run over the combined table.

use crate::table::{NumericSummary, Row, Table};
use chrono::DateTime;
use harvest_core::CoreError;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Text some tools write for a missing value.
pub const NONE_SENTINEL: &str = "None";
pub const PREVIEW_ROWS: usize = 3;
pub const PREVIEW_TITLE_CHARS: usize = 80;
pub const TOP_N: usize = 5;

/// Index columns (`Unnamed: 0`) and mangled duplicates (`title.1`).
const DUPLICATE_COLUMN_PATTERN: &str = r"^Unnamed: \d+$|\.\d+$";

fn duplicate_column() -> Result<&'static Regex, CoreError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(DUPLICATE_COLUMN_PATTERN))
        .as_ref()
        .map_err(|e| CoreError::Internal {
            message: format!("Invalid duplicate column pattern: {}", e),
        })
}

pub fn is_duplicate_column(name: &str) -> Result<bool, CoreError> {
    Ok(duplicate_column()?.is_match(name))
}

/// Drops artefact columns, treats the `None` sentinel as missing and removes
/// rows that have neither a title nor an author.
pub fn prepare(table: &mut Table) -> Result<(), CoreError> {
    let pattern = duplicate_column()?;
    let dropped = table.drop_columns_where(|name| pattern.is_match(name));
    if !dropped.is_empty() {
        debug!("Dropped artefact columns: {:?}", dropped);
    }
    table.replace_with_missing(NONE_SENTINEL);
    let removed = table.drop_rows_missing_all(&["title", "author"]);
    if removed > 0 {
        debug!("Dropped {} rows without title and author", removed);
    }
    Ok(())
}

/// [`prepare`] followed by filling every remaining gap with the `None` text.
pub fn clean(table: &mut Table) -> Result<(), CoreError> {
    prepare(table)?;
    table.fill_missing(NONE_SENTINEL);
    Ok(())
}

fn load_existing(path: &Path) -> Result<Option<Table>, CoreError> {
    if !path.exists() {
        warn!("CSV file {} not found, skipping report", path.display());
        println!("❌ File not found: {}", path.display());
        return Ok(None);
    }
    Table::load(path).map(Some)
}

#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub path: PathBuf,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub file_size_bytes: u64,
    pub preview: Vec<Vec<(String, String)>>,
    pub score: Option<NumericSummary>,
}

pub fn describe_file(path: &Path) -> Result<Option<DatasetReport>, CoreError> {
    let Some(mut table) = load_existing(path)? else {
        return Ok(None);
    };
    clean(&mut table)?;

    let preview = table
        .rows()
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| preview_fields(table.headers(), row))
        .collect();

    Ok(Some(DatasetReport {
        path: path.to_path_buf(),
        row_count: table.len(),
        columns: table.headers().to_vec(),
        file_size_bytes: fs::metadata(path)?.len(),
        preview,
        score: table.numeric_summary("score"),
    }))
}

fn preview_fields(headers: &[String], row: &Row) -> Vec<(String, String)> {
    headers
        .iter()
        .zip(row)
        .map(|(name, cell)| {
            let value = cell.as_deref().unwrap_or(NONE_SENTINEL);
            let shown = match name.as_str() {
                "title" => value.chars().take(PREVIEW_TITLE_CHARS).collect(),
                "created_utc" => format_timestamp(value),
                _ => value.to_string(),
            };
            (name.clone(), shown)
        })
        .collect()
}

fn format_timestamp(value: &str) -> String {
    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| value.to_string())
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📄 {}", self.path.display())?;
        writeln!(f, "Rows: {}", self.row_count)?;
        writeln!(f, "Columns: {}", self.columns.join(", "))?;
        writeln!(
            f,
            "File size: {:.2} KB ({} bytes)",
            self.file_size_bytes as f64 / 1024.0,
            self.file_size_bytes
        )?;

        for (i, fields) in self.preview.iter().enumerate() {
            writeln!(f, "--- Row {} ---", i + 1)?;
            for (name, value) in fields {
                writeln!(f, "  {}: {}", name, value)?;
            }
        }

        match &self.score {
            Some(score) => {
                writeln!(f, "Average score: {:.2}", score.mean)?;
                writeln!(f, "Highest score: {}", score.max)?;
                write!(f, "Lowest score: {}", score.min)
            }
            None => write!(f, "No numeric scores found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopPost {
    pub title: String,
    pub score: String,
    pub subreddit: String,
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct CombinedAnalysis {
    pub row_count: usize,
    pub top_posts: Vec<TopPost>,
    pub top_authors: Vec<(String, usize)>,
    pub posts_with_body_text: usize,
}

pub fn analyze_table(mut table: Table) -> Result<CombinedAnalysis, CoreError> {
    prepare(&mut table)?;

    let text = |row: &Row, column: &str| {
        table
            .cell(row, column)
            .unwrap_or(NONE_SENTINEL)
            .to_string()
    };
    let top_posts = table
        .top_n_by("score", TOP_N)
        .into_iter()
        .map(|row| TopPost {
            title: text(row, "title"),
            score: text(row, "score"),
            subreddit: text(row, "subreddit"),
            author: text(row, "author"),
        })
        .collect();

    let mut top_authors = table.value_counts("author");
    top_authors.truncate(TOP_N);

    Ok(CombinedAnalysis {
        row_count: table.len(),
        top_posts,
        top_authors,
        posts_with_body_text: table.count_non_empty("selftext"),
    })
}

pub fn analyze_file(path: &Path) -> Result<Option<CombinedAnalysis>, CoreError> {
    load_existing(path)?.map(analyze_table).transpose()
}

impl fmt::Display for CombinedAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 Combined dataset: {} posts", self.row_count)?;

        writeln!(f, "Top {} posts by score:", TOP_N)?;
        for post in &self.top_posts {
            writeln!(
                f,
                "  [{}] {} (r/{}, u/{})",
                post.score, post.title, post.subreddit, post.author
            )?;
        }

        writeln!(f, "Most active authors:")?;
        for (author, count) in &self.top_authors {
            writeln!(f, "  {}: {}", author, count)?;
        }

        write!(f, "Posts with body text: {}", self.posts_with_body_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_column_pattern() {
        assert!(duplicate_column().is_ok());
        for name in ["Unnamed: 0", "title.1", "score.12"] {
            assert!(is_duplicate_column(name).unwrap(), "{} should match", name);
        }
        for name in ["title", "upvote_ratio", "Unnamed", "v1.x"] {
            assert!(!is_duplicate_column(name).unwrap(), "{} should not match", name);
        }
    }

    #[test]
    fn test_clean_drops_artefacts_and_empty_rows() {
        let csv = "\
Unnamed: 0,title,author,score,title.1
0,Kept,alice,5,x
1,None,None,7,y
2,,bob,3,z
";
        let mut table = Table::from_reader(csv.as_bytes()).unwrap();
        clean(&mut table).unwrap();

        assert_eq!(table.headers(), &["title", "author", "score"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1][0].as_deref(), Some("None"));
    }

    #[test]
    fn test_preview_truncates_title_and_formats_time() {
        let headers = vec!["title".to_string(), "created_utc".to_string()];
        let row = vec![Some("t".repeat(120)), Some("1700000000.0".to_string())];

        let fields = preview_fields(&headers, &row);
        assert_eq!(fields[0].1.chars().count(), PREVIEW_TITLE_CHARS);
        assert_eq!(fields[1].1, "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_analysis_ranks_scores_and_authors() {
        let csv = "\
title,score,author,subreddit,selftext
a,10,alice,rust,body
b,50,bob,rust,
c,30,alice,python,None
d,20,,python,more
e,40,carol,go,text
f,60,alice,go,
";
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        let analysis = analyze_table(table).unwrap();

        assert_eq!(analysis.row_count, 6);
        let scores: Vec<&str> = analysis
            .top_posts
            .iter()
            .map(|p| p.score.as_str())
            .collect();
        assert_eq!(scores, vec!["60", "50", "40", "30", "20"]);
        assert_eq!(analysis.top_posts[4].author, "None");
        assert_eq!(analysis.top_authors[0], ("alice".to_string(), 3));
        assert_eq!(analysis.top_authors.len(), 3);
        assert_eq!(analysis.posts_with_body_text, 3);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(describe_file(&dir.path().join("absent.csv"))
            .unwrap()
            .is_none());
        assert!(analyze_file(&dir.path().join("absent.csv"))
            .unwrap()
            .is_none());
    }
}
