mod file_ops;

pub use file_ops::{copy_file, ensure_dir, write_file, write_pair, FileOpError, FileOpResult};
