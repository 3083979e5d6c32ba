pub mod analysis;
pub mod dataset;
pub mod extract;
pub mod operations;
pub mod partition;
pub mod registry;

pub use analysis::*;
pub use dataset::*;
pub use extract::*;
pub use operations::*;
pub use partition::*;
pub use registry::ClassRegistry;
