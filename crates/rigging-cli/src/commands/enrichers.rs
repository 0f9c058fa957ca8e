use super::{json_pretty, EXIT_SUCCESS};
use rigging_core::{Engine, EnricherContext};
use rigging_schema::ProjectConfig;

pub fn run(engine: &Engine, project: &ProjectConfig, json: bool) -> Result<u8, String> {
    let ctx = EnricherContext::from_project(project);
    let entries = engine
        .registered_enrichers(project, &ctx)
        .map_err(|e| e.to_string())?;

    if json {
        let payload: Vec<_> = entries
            .iter()
            .map(|(entry, _)| {
                serde_json::json!({
                    "name": entry.identifier,
                    "order": entry.order,
                })
            })
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else if entries.is_empty() {
        println!("no enrichers active");
    } else {
        println!("{:<8} ENRICHER", "ORDER");
        for (entry, _) in &entries {
            println!("{:<8} {}", entry.order, entry.identifier);
        }
    }
    Ok(EXIT_SUCCESS)
}
