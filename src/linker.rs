//! Extension-structure linking
//!
//! Runs last: it needs the complete tag list and the structures the catalog
//! recorded as extending others.

use crate::model::AnalysisContext;

/// Fill `ctx.extension_structs` from the catalog's extending structures.
pub fn link(ctx: &mut AnalysisContext) {
    let linked: Vec<String> = ctx
        .extending_structs
        .iter()
        .filter(|(name, extends)| {
            !ctx.is_vendor(name) && !extends.iter().any(|e| ctx.is_vendor(e))
        })
        .map(|(name, _)| name.clone())
        .collect();

    ctx.extension_structs.extend(linked);
    tracing::debug!(
        "{} of {} extending structures are extension structures",
        ctx.extension_structs.len(),
        ctx.extending_structs.len()
    );
}
