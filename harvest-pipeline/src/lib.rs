pub mod collector;
pub mod combiner;
pub mod reporter;
pub mod session;
pub mod table;

pub use collector::{collect_hot_posts, collect_keyword_posts, write_records};
pub use combiner::combine_csv_files;
pub use reporter::{analyze_file, describe_file, CombinedAnalysis, DatasetReport};
pub use session::{connect, load_credentials};
pub use table::Table;
