//! Plan output formatters.

pub mod json;
pub mod text;

pub use json::{format_plan_json, format_plans_json};
pub use text::{format_batch_summary, format_plan_text};
