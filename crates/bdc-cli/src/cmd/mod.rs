pub mod completions;
pub mod stages;
