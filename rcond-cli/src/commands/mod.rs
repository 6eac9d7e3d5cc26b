//! CLI command implementations.

pub mod check;
pub mod run;

pub use check::check_script;
pub use run::run_script;
