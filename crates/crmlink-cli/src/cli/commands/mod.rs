//! CLI command handlers, one file per command.

mod call;
mod docs;
mod list;
mod params;
mod products;

pub use call::run_call;
pub use docs::{run_completions, run_man};
pub use list::run_list;
pub use products::run_products;
