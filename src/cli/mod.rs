pub mod commands;
pub mod ui;
pub mod util;

pub use ui::Output;
pub use util::{DEFAULT_ARTIFACTS_DIR, ensure_valid, read_json, resolve_config};
