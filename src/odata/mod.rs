//! OData module
//!
//! Filter escaping, query construction and paging for Graph list endpoints

pub mod escape;
pub mod query;

pub use escape::escape_odata_string;
pub use query::{GraphPage, PageCursor, Predicate, QueryBuilder, QueryDescriptor, SortDirection};
