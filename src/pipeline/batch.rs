//! Batch Planner
//!
//! Partitions a large architecture into an ordered sequence of generation
//! batches, each bounded by `BATCH_SIZE` items and grouped for referential
//! locality: a page travels with the components it visibly uses, so one model
//! call produces mutually consistent code for tightly related files. The
//! trade-off is batches of irregular composition.

use std::collections::VecDeque;
use tracing::debug;

use crate::constants::pipeline::BATCH_SIZE;
use crate::types::{ComponentSpec, GenerationBatch, ProjectArchitecture};

/// Cheap heuristic for the number of generation units an architecture needs.
///
/// Used only to decide whether chunking is needed, never to size batches:
/// pages, plus create-new components, plus API routes.
pub fn estimate_unit_count(architecture: &ProjectArchitecture) -> usize {
    architecture.pages.len()
        + architecture
            .components
            .iter()
            .filter(|c| c.requires_generation())
            .count()
        + architecture.routes.iter().filter(|r| r.is_api()).count()
}

/// Partition the architecture into token-bounded generation batches.
///
/// Three work queues (pages, create-new components, API routes) drain in
/// priority order. A page is only opened in a batch that can also hold its
/// still-queued referenced components; components a page references that an
/// earlier batch already consumed are not re-added (first writer wins).
/// Leftover components and routes fill remaining capacity once pages are
/// exhausted. Only non-empty batches are emitted.
pub fn plan_batches(architecture: &ProjectArchitecture) -> Vec<GenerationBatch> {
    let mut pages: VecDeque<_> = architecture.pages.iter().cloned().collect();
    let mut components: VecDeque<ComponentSpec> = architecture
        .components
        .iter()
        .filter(|c| c.requires_generation())
        .cloned()
        .collect();
    let mut routes: VecDeque<_> = architecture
        .routes
        .iter()
        .filter(|r| r.is_api())
        .cloned()
        .collect();

    let mut batches = Vec::new();

    while !pages.is_empty() || !components.is_empty() || !routes.is_empty() {
        let mut batch = GenerationBatch::new();

        // (a) pages, each pulling its referenced components along
        while batch.item_count() < BATCH_SIZE {
            let Some(page) = pages.front() else {
                break;
            };

            // Count only references still in the queue; consumed ones stay
            // where their first batch put them
            let queued_refs = page
                .components
                .iter()
                .filter(|name| components.iter().any(|c| &c.name == *name))
                .count();

            // Defer the page to the next batch rather than split it from its
            // components. A page whose reference set alone exceeds the cap is
            // placed anyway, with as many components as fit.
            if !batch.is_empty() && batch.item_count() + 1 + queued_refs > BATCH_SIZE {
                break;
            }

            let page = pages.pop_front().expect("front checked above");
            let refs = page.components.clone();
            batch.pages.push(page);

            for name in &refs {
                if batch.item_count() >= BATCH_SIZE {
                    break;
                }
                if let Some(pos) = components.iter().position(|c| &c.name == name) {
                    if let Some(component) = components.remove(pos) {
                        batch.components.push(component);
                    }
                }
            }
        }

        // (b) once pages are exhausted or the cap is reached, fill with
        // leftover components
        if pages.is_empty() {
            while batch.item_count() < BATCH_SIZE {
                let Some(component) = components.pop_front() else {
                    break;
                };
                batch.components.push(component);
            }

            // (c) finally fill with leftover routes
            while batch.item_count() < BATCH_SIZE {
                let Some(route) = routes.pop_front() else {
                    break;
                };
                batch.routes.push(route);
            }
        }

        if batch.is_empty() {
            break;
        }

        batch.describe();
        debug!(
            batch = batches.len() + 1,
            items = batch.item_count(),
            composition = %batch.description,
            "Planned batch"
        );
        batches.push(batch);
    }

    batches
}

// =============================================================================
// Tests
// =============================================================================
