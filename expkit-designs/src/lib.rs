//! Loader for counterbalanced design files and inter-trial intervals.

pub mod error;
pub mod loader;
pub mod source;

pub use error::FetchError;
pub use loader::{load_designs_and_itis, try_load, DesignFiles, ITIS_FILE};
pub use source::{source_for, DesignSource, DirSource, HttpSource};
