//! register-catalog: declarative register definitions and the strategies that load them
//!
//! A catalog maps register names ("HAND_ID", "POS_SET(0)") to their address, data type,
//! access rule and value range. Catalogs are built once from declarative sources and are
//! read-only afterwards. Loading is tolerant: a bad entry or an unreadable file yields one
//! [`ConfigurationError`] and the rest of the catalog still loads.

mod types;
pub use types::{
    AccessType, Address, DataType, RangeType, RawAddress, RegisterDefinition, RegisterRecord,
    ValueRange,
};

mod error;
pub use error::{ConfigurationError, UnknownStrategyError};

mod catalog;
pub use catalog::{build_catalog, RegisterCatalog};

mod loader;
pub use loader::{load_records_file, SourcedRecord};

mod strategy;
pub use strategy::{
    load_catalog_dir, CatalogBuild, CatalogStrategy, DirectoryStrategy, FileStrategy,
    StrategyRegistry, DEFAULT_STRATEGY,
};
