use std::fmt;
use std::path::{Path, PathBuf};

/// One of the three disjoint dataset subsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetSplit {
    Train,
    Val,
    Test,
}

impl DatasetSplit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetSplit::Train => "train",
            DatasetSplit::Val => "val",
            DatasetSplit::Test => "test",
        }
    }

    pub fn all() -> [DatasetSplit; 3] {
        [DatasetSplit::Train, DatasetSplit::Val, DatasetSplit::Test]
    }

    /// `<root>/images/<split>`
    pub fn images_dir(&self, dataset_root: &Path) -> PathBuf {
        dataset_root.join("images").join(self.as_str())
    }

    /// `<root>/labels/<split>`
    pub fn labels_dir(&self, dataset_root: &Path) -> PathBuf {
        dataset_root.join("labels").join(self.as_str())
    }
}

impl fmt::Display for DatasetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
