mod error;
mod loader;
mod tle;

pub use error::CatalogError;
pub use loader::{
    load_catalog, parse_structured_catalog, parse_tle_catalog, CatalogBatch, RejectedRecord,
};
pub use tle::{element_set_from_tle, infer_constellation, parse_multi_tle};
