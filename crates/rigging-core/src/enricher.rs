use crate::context::EnricherContext;
use rigging_schema::ResourceList;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EnricherError {
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },
    #[error("{0}")]
    Failed(String),
}

/// A unit failing during one of the pipeline phases.
#[derive(Debug, Error)]
#[error("enricher '{unit}' failed during {phase}: {source}")]
pub struct PipelineError {
    pub unit: String,
    pub phase: Phase,
    #[source]
    pub source: EnricherError,
}

/// The fixed pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seed,
    Labels,
    Selectors,
    Adapt,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Seed, Phase::Labels, Phase::Selectors, Phase::Adapt];

    fn invoke(
        self,
        unit: &dyn Enricher,
        ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        match self {
            Phase::Seed => unit.add_default_resources(ctx, list),
            Phase::Labels => unit.enrich_labels(ctx, list),
            Phase::Selectors => unit.add_missing_selectors(ctx, list),
            Phase::Adapt => unit.adapt(ctx, list),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Seed => write!(f, "seed"),
            Phase::Labels => write!(f, "label enrichment"),
            Phase::Selectors => write!(f, "selector completion"),
            Phase::Adapt => write!(f, "adaptation"),
        }
    }
}

/// A pluggable step contributing to the resource document.
///
/// Every phase method defaults to a no-op. Implementations must be
/// idempotent per phase: running a phase again on its own output must not
/// change the document. Items are only ever added or refined, never removed.
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    /// Contribute baseline items. Items already in the document keep their
    /// field values.
    fn add_default_resources(
        &self,
        _ctx: &EnricherContext,
        _list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        Ok(())
    }

    /// Add labels to existing items. A label already present is never
    /// overwritten.
    fn enrich_labels(
        &self,
        _ctx: &EnricherContext,
        _list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        Ok(())
    }

    /// Fill in selectors on items lacking one. Present selectors are left
    /// untouched.
    fn add_missing_selectors(
        &self,
        _ctx: &EnricherContext,
        _list: &mut ResourceList,
    ) -> Result<(), EnricherError> {
        Ok(())
    }

    /// Final pass; labels and selectors are complete at this point.
    fn adapt(&self, _ctx: &EnricherContext, _list: &mut ResourceList) -> Result<(), EnricherError> {
        Ok(())
    }
}

/// Drives an ordered list of enrichers through the pipeline phases.
pub struct EnricherManager {
    enrichers: Vec<Box<dyn Enricher>>,
}

impl EnricherManager {
    pub fn new(enrichers: Vec<Box<dyn Enricher>>) -> Self {
        Self { enrichers }
    }

    pub fn names(&self) -> Vec<&str> {
        self.enrichers.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.enrichers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrichers.is_empty()
    }

    /// Run one phase over every enricher in order. The first failure aborts
    /// the phase.
    pub fn run_phase(
        &self,
        phase: Phase,
        ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), PipelineError> {
        debug!("running {phase} phase over {} enrichers", self.enrichers.len());
        for enricher in &self.enrichers {
            phase
                .invoke(enricher.as_ref(), ctx, list)
                .map_err(|source| PipelineError {
                    unit: enricher.name().to_owned(),
                    phase,
                    source,
                })?;
        }
        Ok(())
    }

    pub fn add_default_resources(
        &self,
        ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), PipelineError> {
        self.run_phase(Phase::Seed, ctx, list)
    }

    pub fn enrich_labels(
        &self,
        ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), PipelineError> {
        self.run_phase(Phase::Labels, ctx, list)
    }

    pub fn add_missing_selectors(
        &self,
        ctx: &EnricherContext,
        list: &mut ResourceList,
    ) -> Result<(), PipelineError> {
        self.run_phase(Phase::Selectors, ctx, list)
    }

    pub fn adapt(&self, ctx: &EnricherContext, list: &mut ResourceList) -> Result<(), PipelineError> {
        self.run_phase(Phase::Adapt, ctx, list)
    }

    /// Run all phases in their fixed order.
    pub fn enrich(&self, ctx: &EnricherContext, list: &mut ResourceList) -> Result<(), PipelineError> {
        for phase in Phase::ALL {
            self.run_phase(phase, ctx, list)?;
        }
        info!(
            "enriched {} items with {} enrichers",
            list.len(),
            self.enrichers.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_schema::{parse_project_str, Resource, ResourceKind};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn record(&self, phase: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{phase}", self.name));
        }
    }

    impl Enricher for Recorder {
        fn name(&self) -> &str {
            &self.name
        }
        fn add_default_resources(
            &self,
            _ctx: &EnricherContext,
            _list: &mut ResourceList,
        ) -> Result<(), EnricherError> {
            self.record("seed");
            Ok(())
        }
        fn enrich_labels(
            &self,
            _ctx: &EnricherContext,
            _list: &mut ResourceList,
        ) -> Result<(), EnricherError> {
            self.record("labels");
            Ok(())
        }
        fn add_missing_selectors(
            &self,
            _ctx: &EnricherContext,
            _list: &mut ResourceList,
        ) -> Result<(), EnricherError> {
            self.record("selectors");
            Ok(())
        }
        fn adapt(&self, _ctx: &EnricherContext, _list: &mut ResourceList) -> Result<(), EnricherError> {
            self.record("adapt");
            Ok(())
        }
    }

    struct FailingSeed;

    impl Enricher for FailingSeed {
        fn name(&self) -> &str {
            "failing"
        }
        fn add_default_resources(
            &self,
            _ctx: &EnricherContext,
            _list: &mut ResourceList,
        ) -> Result<(), EnricherError> {
            Err(EnricherError::Failed("boom".to_owned()))
        }
    }

    struct Noop;

    impl Enricher for Noop {
        fn name(&self) -> &str {
            "noop"
        }
    }

    fn ctx() -> EnricherContext {
        EnricherContext::from_project(&parse_project_str("[project]\nname = \"demo\"\n").unwrap())
    }

    #[test]
    fn phases_run_in_order_and_units_in_registry_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = EnricherManager::new(vec![
            Box::new(Recorder {
                name: "a".to_owned(),
                log: Arc::clone(&log),
            }),
            Box::new(Recorder {
                name: "b".to_owned(),
                log: Arc::clone(&log),
            }),
        ]);
        let mut list = ResourceList::new();
        manager.enrich(&ctx(), &mut list).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a:seed",
                "b:seed",
                "a:labels",
                "b:labels",
                "a:selectors",
                "b:selectors",
                "a:adapt",
                "b:adapt"
            ]
        );
    }

    #[test]
    fn failing_unit_aborts_remaining_phases() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = EnricherManager::new(vec![
            Box::new(FailingSeed),
            Box::new(Recorder {
                name: "after".to_owned(),
                log: Arc::clone(&log),
            }),
        ]);
        let mut list = ResourceList::new();
        let err = manager.enrich(&ctx(), &mut list).unwrap_err();
        assert_eq!(err.unit, "failing");
        assert_eq!(err.phase, Phase::Seed);
        assert!(err.to_string().contains("boom"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn default_methods_leave_document_untouched() {
        let manager = EnricherManager::new(vec![Box::new(Noop)]);
        let mut list = ResourceList::new();
        list.push(Resource::new(ResourceKind::Service, "web"));
        let before = list.clone();
        manager.enrich(&ctx(), &mut list).unwrap();
        assert_eq!(list, before);
        assert_eq!(manager.names(), vec!["noop"]);
    }
}
