//! Purpose: Hold top-level CLI command dispatch for `adslot`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Output envelopes and exit code semantics match `main.rs` helpers.

use adslot::api::SlotRegistry;

use super::scenario::{Scenario, run_scenario};
use super::*;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "adslot", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Validate { path } => {
            let text = read_file(&path)?;
            let registry = SlotRegistry::from_json(&text)?;
            let (report, all_valid) = validation_report(&registry);
            emit_json(report);
            if all_valid {
                Ok(RunOutcome::ok())
            } else {
                Ok(RunOutcome::with_code(to_exit_code(ErrorKind::Usage)))
            }
        }
        Command::Simulate { path } => {
            let text = read_file(&path)?;
            let scenario = Scenario::from_json(&text)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start async runtime")
                        .with_source(err)
                })?;
            let report = runtime.block_on(run_scenario(scenario));
            let value = serde_json::to_value(&report).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode scenario report")
                    .with_source(err)
            })?;
            emit_json(value);
            Ok(RunOutcome::ok())
        }
    }
}

fn validation_report(registry: &SlotRegistry) -> (Value, bool) {
    let mut ids = registry.slot_ids();
    ids.sort();

    let mut all_valid = true;
    let mut slots = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(slot) = registry.get_slot(&id) else {
            continue;
        };
        let mut entry = json!({
            "id": id,
            "type": slot.kind().to_string(),
            "valid": true,
        });
        if let Err(err) = slot.validate() {
            all_valid = false;
            entry["valid"] = json!(false);
            entry["error"] = error_fields(&err.with_slot(id));
        }
        slots.push(entry);
    }

    (json!({ "valid": all_valid, "slots": slots }), all_valid)
}
