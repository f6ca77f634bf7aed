pub use crate::cache::{CacheStats, PartitionCacheEntry, PartitionSetCache};
pub use crate::config::{CacheConfig, RunnerConfig};
pub use crate::error::{Error, Result};
pub use crate::partition::{Partition, PartitionMetadata, PartitionSet};
pub use crate::result::MaterializedResult;
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::{Column, RowBatch, Scalar};
