//! Data access services: the `DataSource` contract and its mock backend.

pub mod analytics;
pub mod mock;
pub mod source;
pub mod types;

pub use mock::MockDataSource;
pub use source::{DataSource, SourceResult};
pub use types::*;
