//! Entry point: runs a named subroutine with a context and returns
//! the resulting phase action (§4.5).

use anyhow::Result;

use crate::compiler::{phase_default, run_subroutine, SubroutineMap};
use crate::context::Context;

const WELL_KNOWN_PHASES: &[&str] = &[
    "vcl_recv",
    "vcl_hash",
    "vcl_hit",
    "vcl_miss",
    "vcl_pass",
    "vcl_fetch",
    "vcl_deliver",
    "vcl_error",
    "vcl_pipe",
    "vcl_init",
    "vcl_synth",
];

/// Run the subroutine named `name`. If absent and `name` is one of the
/// well-known phases, synthesize a no-op returning that phase's
/// default action; absent and not a well-known phase is a usage
/// error, since there is nothing sensible to run or default to.
pub fn execute(subroutines: &SubroutineMap, name: &str, ctx: &mut Context) -> Result<String> {
    match subroutines.get(name) {
        Some(sub) => Ok(run_subroutine(sub, ctx, subroutines)),
        None if WELL_KNOWN_PHASES.contains(&name) => Ok(phase_default(name).to_string()),
        None => Err(anyhow::anyhow!(
            "no subroutine named {name} and it is not a well-known phase"
        )),
    }
}

/// Convenience loop over `execute` that follows `restart` returns by
/// re-entering `vcl_recv`, up to the engine's configured restart
/// budget. The bound itself is enforced inside the `RestartStatement`
/// handler (`EngineError::MaxRestartsExceeded`); this loop simply
/// stops being asked to continue once that happens, since a restart
/// action is never returned once the budget is exhausted.
pub fn run_to_completion(subroutines: &SubroutineMap, start_phase: &str, ctx: &mut Context) -> Result<String> {
    let mut phase = start_phase.to_string();
    loop {
        let action = execute(subroutines, &phase, ctx)?;
        if action == "restart" {
            phase = "vcl_recv".to_string();
            continue;
        }
        return Ok(action);
    }
}
