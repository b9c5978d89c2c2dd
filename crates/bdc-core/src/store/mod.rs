//! Delimited-text record tables, plain or zipped.
//!
//! Identifier columns deserialize as `String`, so values such as `"01"` keep
//! their leading zeros. Records stream through callbacks; only the unit being
//! processed is ever held in memory.

mod reader;
mod writer;

pub use reader::{find_table, for_each_record, read_records};
pub use writer::RecordWriter;
