use anyhow::Context;
use harvest_core::{AppConfig, DEFAULT_CONFIG_FILE};
use harvest_pipeline::{
    analyze_file, collect_hot_posts, collect_keyword_posts, combine_csv_files, connect,
    describe_file,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("subreddit_harvest=info,harvest_pipeline=info,reddit_client=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting subreddit harvest");

    let config = AppConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))
        .context("failed to load pipeline configuration")?
        .with_env_overrides();

    let session = connect(&config.secrets_path)
        .await
        .context("failed to create Reddit session")?;

    let mut collected: Vec<PathBuf> = Vec::with_capacity(config.forums.len());
    for forum in &config.forums {
        let output = config.forum_output(&forum.name);
        println!("\n=== r/{} ===", forum.name);

        let saved = collect_hot_posts(&session, &forum.name, forum.limit, &output).await?;
        if !saved {
            tracing::warn!("Collection for r/{} failed, skipping its report", forum.name);
            continue;
        }

        if let Some(report) = describe_file(&output)? {
            println!("{}", report);
            collected.push(output);
        }
    }

    if let Some(search) = &config.search {
        println!("\n=== Search: '{}' ===", search.query);
        let output = config.output_dir.join(&search.output);
        collect_keyword_posts(&session, &search.query, &search.forums, search.limit, &output)
            .await?;
    }

    if collected.is_empty() {
        println!("\n❌ No per-forum CSV files available, skipping combine step");
    } else {
        let combined = config.combined_output();
        let rows = combine_csv_files(&collected, &combined)
            .with_context(|| format!("failed to combine into {}", combined.display()))?;
        println!("\n✅ Combined {} rows into {}", rows, combined.display());

        if let Some(analysis) = analyze_file(&combined)? {
            println!("{}", analysis);
        }
    }

    let metrics = session.get_api_metrics().await;
    tracing::info!(
        "API usage: {} requests, {} failed, {} rate limited, avg {:?}",
        metrics.total_requests,
        metrics.failed_requests,
        metrics.rate_limited_requests,
        metrics.average_response_time()
    );

    Ok(())
}
