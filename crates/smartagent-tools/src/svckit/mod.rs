//! Service Kit - Agent Tools
//!
//! Built-in tools that implement `smartagent_core::Tool`.

mod calc;
mod time_in_timezone;
mod web_search;

pub use calc::CalcTool;
pub use time_in_timezone::{TimeInTimezoneTool, resolve_timezone};
pub use web_search::WebSearchTool;
