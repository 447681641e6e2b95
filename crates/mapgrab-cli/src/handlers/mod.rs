//! Command handlers - extracted from main.rs for testability
//!
//! Each handler resolves its command into a value and renders it in the
//! configured output format; printing happens in `execute_*`.

pub mod inspect;
pub mod parse;
pub mod query;

pub use inspect::{execute_inspect, inspect_scene};
pub use parse::{execute_parse, render_parse};
pub use query::{build_locator, execute_query, query_scene};
