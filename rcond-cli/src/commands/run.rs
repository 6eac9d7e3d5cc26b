//! Run a scenario script unit by unit.

use crate::eval::{run_unit, UnitOutcome};
use crate::script::Script;
use anyhow::{bail, Result};
use rcond_core::{Session, SessionOptions};
use std::path::Path;

/// Evaluate every unit of the script in one session
///
/// An aborted unit does not stop the run. With `strict`, the command fails
/// if any unit aborted.
pub fn run_script(script_path: &Path, options: SessionOptions, strict: bool) -> Result<()> {
    let script = Script::from_file(script_path)?;
    tracing::debug!(
        script = %script_path.display(),
        units = script.units.len(),
        warn = %options.warn,
        "running script"
    );

    let mut session = Session::new(options);
    let mut aborted = 0;
    for unit in &script.units {
        if run_unit(&mut session, unit) == UnitOutcome::Aborted {
            aborted += 1;
        }
    }
    tracing::debug!(aborted, "script finished");

    if strict && aborted > 0 {
        bail!("{} of {} units aborted", aborted, script.units.len());
    }
    Ok(())
}
