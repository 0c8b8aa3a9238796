//! One reconciliation tick
//!
//! A tick processes every controller serially to completion: collect the
//! object set, fingerprint it, skip when unchanged, otherwise render the
//! template and apply each rendered document. The hash table is owned by the
//! tick driver and passed in explicitly.
//!
//! Abort scoping: a snapshot or controller-file failure aborts the whole
//! tick with the table untouched; every other failure aborts only the
//! current controller's cycle. Whether a cycle failure invalidates that
//! controller's table entry is decided by
//! [`Error::invalidates_fingerprint`], not by the stage that failed.

use tracing::{error, info, warn};

use crate::collect::{collect_objects, fetch_snapshot, ClusterSnapshot, ObjectSource};
use crate::config::Config;
use crate::crd::AlfaControllr;
use crate::fingerprint::{fingerprint, HashTable};
use crate::pipeline::{split_and_apply, ManifestApplier};
use crate::source::ControllerSource;
use crate::template::TemplateEngine;
use crate::{Error, Result};

/// What one tick did, per controller cycle outcome
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Controller records processed
    pub controllers: usize,
    /// Documents handed to the applier
    pub documents_applied: usize,
    /// Cycles skipped because the fingerprint was unchanged
    pub skipped: usize,
    /// Cycles aborted by a failure
    pub failed: usize,
}

#[derive(Debug)]
enum CycleOutcome {
    Applied(usize),
    Skipped,
}

/// Run one full tick
///
/// # Errors
///
/// Returns an error only for tick-scoped failures (global snapshot or
/// controller file); per-controller failures are logged and counted in the
/// summary.
pub async fn tick(
    source: &dyn ObjectSource,
    applier: &dyn ManifestApplier,
    engine: &TemplateEngine,
    controllers: &ControllerSource,
    table: &mut HashTable,
    config: &Config,
) -> Result<TickSummary> {
    info!("retrieving cluster snapshot");
    let snapshot = fetch_snapshot(source).await?;

    let records = controllers.load(source).await?;

    let mut summary = TickSummary {
        controllers: records.len(),
        ..Default::default()
    };

    for controller in &records {
        let name = match controller.metadata.name.as_deref() {
            Some(name) => name,
            None => {
                error!("controller record has no name, skipping");
                summary.failed += 1;
                continue;
            }
        };
        info!(controller = %name, "reconciling");

        match run_cycle(
            source, applier, engine, &snapshot, controller, name, table, config,
        )
        .await
        {
            Ok(CycleOutcome::Applied(count)) => summary.documents_applied += count,
            Ok(CycleOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                match e {
                    Error::EmptyCollection => {
                        warn!(controller = %name, "0 objects found, aborting cycle")
                    }
                    _ => error!(controller = %name, error = %e, "aborting cycle"),
                }
                if e.invalidates_fingerprint() {
                    table.invalidate(name);
                }
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// One controller's cycle: collect, fingerprint, render, apply
///
/// Every stage surfaces its failure as an [`Error`]; the caller decides
/// logging and table invalidation from the error's scope predicates.
#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    source: &dyn ObjectSource,
    applier: &dyn ManifestApplier,
    engine: &TemplateEngine,
    snapshot: &ClusterSnapshot,
    controller: &AlfaControllr,
    name: &str,
    table: &mut HashTable,
    config: &Config,
) -> Result<CycleOutcome> {
    controller.spec.validate()?;

    let objects = collect_objects(source, snapshot, controller).await?;
    if objects.is_empty() {
        return Err(Error::EmptyCollection);
    }

    let metadata = serde_yaml::to_value(&controller.metadata)
        .map_err(|e| Error::serialization(format!("unable to encode controller record: {}", e)))?;
    let spec = serde_yaml::to_value(&controller.spec)
        .map_err(|e| Error::serialization(format!("unable to encode controller record: {}", e)))?;
    let current = fingerprint(&objects, &metadata, &spec)?;

    if !table.should_proceed(name, &current) {
        info!(
            controller = %name,
            objects = objects.len(),
            fingerprint = %current,
            "unchanged, skipping"
        );
        return Ok(CycleOutcome::Skipped);
    }
    info!(
        controller = %name,
        objects = objects.len(),
        fingerprint = %current,
        "changed, applying template"
    );

    let rendered = engine.render(
        &controller.spec.template,
        &objects,
        controller,
        config.owner_references,
        config.managed_by.as_deref(),
    )?;

    let count = split_and_apply(&rendered, applier, name).await?;
    table.commit(name, &current);
    info!(controller = %name, documents = count, "cycle complete");
    Ok(CycleOutcome::Applied(count))
}
