// Submodules for separation of concerns
mod builder;
mod cursor;
mod eval;
mod exec;
mod features;
mod params;
mod types;

// Public API surface
pub use builder::{FindQuery, QueryBuilder};
pub use cursor::Cursor;
pub use eval::eval_filter;
pub use exec::{count_docs, find_docs};
pub use features::{ApiFeatures, DEFAULT_LIMIT, DEFAULT_PAGE};
pub use params::{ParamValue, QueryParams, RESERVED_KEYS};
pub use types::{CmpOp, Filter, FindOptions, Order, Projection, SortSpec};
