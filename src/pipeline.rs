use std::path::Path;

use anyhow::{bail, Result};
use tracing::{error, info};

use crate::{
    db::{TollStore, UpsertReport},
    export,
    matcher::match_tolls,
    model::{Element, LocatedToll},
    stats,
};

#[derive(Debug, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub matched: usize,
    /// Tolls with coordinates, the ones that were persisted.
    pub located: usize,
    pub csv_written: bool,
    pub report: UpsertReport,
}

/// Matches the fetched elements and persists the result.
///
/// The store is only opened once there is something to write. A CSV failure
/// is logged and skipped; every other failure ends the run.
pub fn run<S, F>(elements: Vec<Element>, csv: &Path, open_store: F) -> Result<Summary>
where
    S: TollStore,
    F: FnOnce() -> Result<S>,
{
    info!("matching toll booths with highways");
    let matched = match_tolls(elements);
    info!(
        "{}/{} toll booths matched with highway data ({:.1}%)",
        matched.matched,
        matched.total(),
        matched.coverage() * 100.0
    );

    let total = matched.total();
    let tolls: Vec<_> = matched
        .records
        .into_iter()
        .filter_map(LocatedToll::new)
        .collect();
    if tolls.len() < total {
        info!("dropped {} toll booths without coordinates", total - tolls.len());
    }
    if tolls.is_empty() {
        bail!("No valid toll booths found");
    }
    info!("parsed {} valid toll booths", tolls.len());

    stats::summarise(&tolls).log();

    info!(path = %csv.display(), "saving csv");
    let csv_written = match export::write_csv(csv, &tolls) {
        Ok(()) => {
            info!(path = %csv.display(), "saved csv");
            true
        }
        Err(e) => {
            error!(path = %csv.display(), "failed to save csv: {e:#}");
            false
        }
    };

    let mut store = open_store()?;
    store.prepare()?;
    let report = store.upsert(&tolls)?;
    info!("{} new records inserted", report.inserted);
    info!("{} existing records updated", report.updated);

    Ok(Summary {
        total,
        matched: matched.matched,
        located: tolls.len(),
        csv_written,
        report,
    })
}
