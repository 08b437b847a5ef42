//! Tools exposed to tool-using stage adapters.

pub mod search_tools;
