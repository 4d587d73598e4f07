pub mod paths;
pub mod progress;
pub mod task;

pub use paths::Storage;
