//! Group-by counting over categorical dimensions.
//!
//! A [`SummarySchema`] declares the dimensions, their code domains, the
//! combinations to cross-tabulate and the measures to count. [`aggregate`]
//! makes one pass over the rows and produces a dense [`SummaryTable`].

mod engine;
mod schema;
mod table;

pub use engine::{GroupKey, Row, aggregate};
pub use schema::{Count, DimensionSpec, Measure, SchemaBuilder, SummarySchema};
pub use table::SummaryTable;
