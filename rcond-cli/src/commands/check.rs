//! Validate a scenario script without running it.

use crate::script::Script;
use anyhow::Result;
use std::path::Path;

pub fn check_script(script_path: &Path) -> Result<()> {
    let script = Script::from_file(script_path)?;
    println!(
        "{}: {} units, {} statements",
        script_path.display(),
        script.units.len(),
        script.statement_count()
    );
    Ok(())
}
