use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use rigging_core::{Engine, GenerateOutcome};
use rigging_schema::ProjectConfig;

pub fn run(engine: &Engine, project: &ProjectConfig, json: bool) -> Result<u8, String> {
    let pb = if json {
        None
    } else {
        Some(spinner("generating resources..."))
    };

    let outcome = match engine.generate(project) {
        Ok(outcome) => {
            if let Some(ref pb) = pb {
                let msg = match outcome {
                    GenerateOutcome::Skipped(_) => "generation skipped",
                    GenerateOutcome::Generated(_) => "resources generated",
                };
                spin_ok(pb, msg);
            }
            outcome
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "generation failed");
            }
            return Err(e.to_string());
        }
    };

    match outcome {
        GenerateOutcome::Skipped(reason) => {
            if json {
                let payload = serde_json::json!({
                    "status": "skipped",
                    "reason": reason,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("skipped: {reason}");
            }
        }
        GenerateOutcome::Generated(result) => {
            if json {
                let payload = serde_json::json!({
                    "status": "generated",
                    "project": project.project.name,
                    "resources": result.kubernetes.len(),
                    "enrichers": result.enrichers,
                    "files": result.written,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                for written in &result.written {
                    println!(
                        "{} ({} item files)",
                        written.document.display(),
                        written.items.len()
                    );
                }
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
