//! Type catalog
//!
//! Walks every declared type once and sorts it into structures, handles, enums,
//! bitmasks and base types, building the storage-type mapping and the
//! structure → `VkStructureType` mapping on the way.

use crate::error::{RegistryError, Result};
use crate::model::{AnalysisContext, HandleInfo, StructInfo};
use crate::registry::{Element, Registry};

/// Marker identifying a member's legal values as a structure type tag
pub const STRUCTURE_TYPE_MARKER: &str = "VK_STRUCTURE_TYPE";

const DISPATCHABLE_HANDLE_MACRO: &str = "VK_DEFINE_HANDLE";
const FLAGS_32: &str = "VkFlags";
const FLAGS_64: &str = "VkFlags64";
const UINT32: &str = "uint32_t";
const UINT64: &str = "uint64_t";

/// Build the type catalog. Requires the platform index to be complete.
pub fn build(registry: &Registry, ctx: &mut AnalysisContext) -> Result<()> {
    for ty in registry.find_all("types/type") {
        match ty.attr("category") {
            Some("struct") => add_struct(ty, ctx)?,
            Some("handle") => add_handle(ty, ctx),
            Some("enum") => add_enum(ty, ctx),
            Some("basetype") => add_basetype(ty, ctx),
            Some("bitmask") => add_bitmask(ty, ctx)?,
            _ => {}
        }
    }

    tracing::debug!(
        "catalogued {} structures, {} handles, {} type mappings",
        ctx.structures.len(),
        ctx.handles.len(),
        ctx.type_mappings.len()
    );
    Ok(())
}

fn structure_type(ty: &Element) -> Option<&str> {
    ty.children_named("member")
        .filter_map(|m| m.attr("values"))
        .find(|values| values.contains(STRUCTURE_TYPE_MARKER))
}

fn add_struct(ty: &Element, ctx: &mut AnalysisContext) -> Result<()> {
    let name = ty
        .attr("name")
        .ok_or_else(|| RegistryError::missing("struct type", "name"))?;
    if ctx.disabled_types.contains(name) {
        return Ok(());
    }

    let stype = structure_type(ty);
    let extends: Vec<String> = ty
        .attr("structextends")
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    if let Some(stype) = stype {
        ctx.structure_types.insert(name.to_string(), stype.to_string());
    }
    ctx.structures.insert(
        name.to_string(),
        StructInfo {
            name: name.to_string(),
            structure_type: stype.map(str::to_string),
            extends: extends.clone(),
        },
    );

    if stype.is_some_and(|s| ctx.is_vendor(s)) {
        return Ok(());
    }
    if ctx.detect_words.contains(name) {
        ctx.feature_detection_structs.insert(name.to_string());
    }
    if ctx.type_guards.contains_key(name) {
        tracing::debug!("{} is platform guarded, left out of extension analysis", name);
        ctx.diagnostics.guarded_structs.push(name.to_string());
        return Ok(());
    }
    if !extends.is_empty() {
        if stype.is_none() {
            return Err(RegistryError::MissingStructureType {
                name: name.to_string(),
            });
        }
        ctx.extending_structs.insert(name.to_string(), extends);
    }
    Ok(())
}

fn add_handle(ty: &Element, ctx: &mut AnalysisContext) {
    let Some(name) = ty.child_text("name") else {
        ctx.diagnostics.skipped_alias_handles += 1;
        return;
    };
    if ctx.is_vendor(name) {
        ctx.diagnostics.skipped_vendor_handles += 1;
        return;
    }

    let parents = ty
        .attr("parent")
        .map(|p| p.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let dispatchable = ty.child_text("type") == Some(DISPATCHABLE_HANDLE_MACRO);

    ctx.handles.insert(
        name.to_string(),
        HandleInfo {
            name: name.to_string(),
            dispatchable,
            parents,
        },
    );
}

fn add_enum(ty: &Element, ctx: &mut AnalysisContext) {
    if let Some(name) = ty.attr("name") {
        ctx.type_mappings.seed(name, UINT32);
    }
}

fn add_basetype(ty: &Element, ctx: &mut AnalysisContext) {
    let Some(name) = ty.child_text("name") else {
        return;
    };
    match ty.child_text("type") {
        Some(underlying) => {
            ctx.type_mappings.seed(name, underlying);
        }
        None => ctx.diagnostics.opaque_basetypes.push(name.to_string()),
    }
}

fn add_bitmask(ty: &Element, ctx: &mut AnalysisContext) -> Result<()> {
    let Some(name) = ty.child_text("name") else {
        ctx.diagnostics.skipped_alias_bitmasks += 1;
        return Ok(());
    };
    let width = ty.child_text("type").unwrap_or_default();
    let storage = match width {
        FLAGS_64 => UINT64,
        FLAGS_32 => UINT32,
        other => {
            return Err(RegistryError::UnknownBitmaskWidth {
                name: name.to_string(),
                width: other.to_string(),
            });
        }
    };
    ctx.type_mappings.seed(name, storage);
    Ok(())
}
