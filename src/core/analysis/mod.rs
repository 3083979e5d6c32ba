mod summary;

pub use summary::{summarize_dataset, summarize_split, DatasetSummary, SplitSummary};
