use harvest_core::{CoreError, ErrorReporter, MissingValue, PostRecord, CSV_HEADER};
use reddit_client::PostSource;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

fn validate_name(value: &str, what: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid_input(format!("{} must be a non-empty string", what)));
    }
    Ok(())
}

fn validate_limit(limit: u32) -> Result<(), CoreError> {
    if limit == 0 {
        return Err(CoreError::invalid_input("limit must be a positive integer"));
    }
    Ok(())
}

fn validate_output(output: &Path) -> Result<(), CoreError> {
    if output.as_os_str().is_empty() {
        return Err(CoreError::invalid_input("output path must be a non-empty string"));
    }
    Ok(())
}

/// Writes the header and one row per record. The file is only created here,
/// after every post has been fetched.
pub fn write_records(
    output: &Path,
    records: &[PostRecord],
    missing: MissingValue,
) -> Result<usize, CoreError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record(record.to_row(missing))?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", records.len(), output.display());
    Ok(records.len())
}

/// Saves up to `limit` currently popular posts of `subreddit` to `output`.
///
/// Invalid arguments are returned as `Err` before any request is made. Fetch and
/// write failures are reported and turn into `Ok(false)`.
pub async fn collect_hot_posts<S: PostSource>(
    source: &S,
    subreddit: &str,
    limit: u32,
    output: &Path,
) -> Result<bool, CoreError> {
    validate_name(subreddit, "subreddit name")?;
    validate_limit(limit)?;
    validate_output(output)?;

    info!("Collecting up to {} hot posts from r/{}", limit, subreddit);
    let result = async {
        let posts = source.hot_posts(subreddit, limit).await?;
        let records: Vec<PostRecord> = posts
            .into_iter()
            .map(|post| post.into_record(subreddit))
            .collect();
        write_records(output, &records, MissingValue::Placeholder)
    }
    .await;

    match result {
        Ok(count) => {
            println!(
                "✅ Saved {} posts from r/{} to {}",
                count,
                subreddit,
                output.display()
            );
            Ok(true)
        }
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            println!("❌ Error fetching posts from r/{}: {}", subreddit, e);
            Ok(false)
        }
    }
}

/// Saves posts matching `query` from each of `subreddits`, up to `limit` per
/// subreddit, to a single `output` file.
pub async fn collect_keyword_posts<S: PostSource>(
    source: &S,
    query: &str,
    subreddits: &[String],
    limit: u32,
    output: &Path,
) -> Result<bool, CoreError> {
    validate_name(query, "search query")?;
    if subreddits.is_empty() {
        return Err(CoreError::invalid_input("subreddit list must not be empty"));
    }
    for subreddit in subreddits {
        validate_name(subreddit, "subreddit name")?;
    }
    validate_limit(limit)?;
    validate_output(output)?;

    info!(
        "Searching {} subreddits for '{}', up to {} posts each",
        subreddits.len(),
        query,
        limit
    );
    let result = async {
        let mut records = Vec::new();
        let mut per_subreddit = Vec::with_capacity(subreddits.len());
        for subreddit in subreddits {
            let posts = source.search_posts(subreddit, query, limit).await?;
            per_subreddit.push((subreddit.as_str(), posts.len()));
            records.extend(posts.into_iter().map(|post| post.into_record(query)));
        }
        write_records(output, &records, MissingValue::Empty)?;
        Ok::<_, CoreError>(per_subreddit)
    }
    .await;

    match result {
        Ok(per_subreddit) => {
            let mut total = 0;
            for (subreddit, count) in per_subreddit {
                println!("r/{}: {} posts", subreddit, count);
                total += count;
            }
            println!(
                "✅ Saved {} posts matching '{}' to {}",
                total,
                query,
                output.display()
            );
            Ok(true)
        }
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            println!("❌ Error searching for '{}': {}", query, e);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::RedditApiError;
    use reddit_client::RedditPostData;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl PostSource for CountingSource {
        async fn hot_posts(&self, _: &str, _: u32) -> Result<Vec<RedditPostData>, CoreError> {
            self.calls.set(self.calls.get() + 1);
            Err(CoreError::RedditApi(RedditApiError::RequestTimeout))
        }

        async fn search_posts(
            &self,
            _: &str,
            _: &str,
            _: u32,
        ) -> Result<Vec<RedditPostData>, CoreError> {
            self.calls.set(self.calls.get() + 1);
            Err(CoreError::RedditApi(RedditApiError::RequestTimeout))
        }
    }

    fn source() -> CountingSource {
        CountingSource {
            calls: Cell::new(0),
        }
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_fetching() {
        let source = source();
        let out = Path::new("unused.csv");

        let result = collect_hot_posts(&source, "", 10, out).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

        let result = collect_hot_posts(&source, "rust", 0, out).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

        let result = collect_hot_posts(&source, "rust", 10, Path::new("")).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

        let result = collect_keyword_posts(&source, "", &["rust".to_string()], 5, out).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

        let result = collect_keyword_posts(&source, "async", &[], 5, out).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

        let forums = vec!["rust".to_string(), " ".to_string()];
        let result = collect_keyword_posts(&source, "async", &forums, 5, out).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

        assert_eq!(source.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_false_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("rust_posts.csv");
        let source = source();

        assert!(!collect_hot_posts(&source, "rust", 10, &out).await.unwrap());
        assert!(!out.exists());

        let forums = vec!["rust".to_string()];
        assert!(!collect_keyword_posts(&source, "async", &forums, 10, &out)
            .await
            .unwrap());
        assert!(!out.exists());
        assert_eq!(source.calls.get(), 2);
    }
}
