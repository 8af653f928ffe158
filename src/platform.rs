//! Platform & extension indexing
//!
//! Collects vendor tags, platform guard symbols and extension support status, and
//! assigns each command and type required by a platform extension its guard.

use crate::error::{RegistryError, Result};
use crate::model::{AnalysisContext, ExtensionRecord, SupportStatus};
use crate::registry::{Element, Registry};

/// Index tags, platforms and extensions into `ctx`.
pub fn index(registry: &Registry, ctx: &mut AnalysisContext) -> Result<()> {
    for tag in registry.find_all("tags/tag") {
        if let Some(name) = tag.attr("name") {
            ctx.extension_tags.insert(name);
        }
    }

    for platform in registry.find_all("platforms/platform") {
        let name = platform
            .attr("name")
            .ok_or_else(|| RegistryError::missing("platform", "name"))?;
        let protect = platform
            .attr("protect")
            .ok_or_else(|| RegistryError::missing(format!("platform {}", name), "protect"))?;
        ctx.platforms.insert(name.to_string(), protect.to_string());
    }

    for extension in registry.find_all("extensions/extension") {
        let record = extension_record(extension)?;
        index_extension(ctx, &record)?;
        ctx.extensions.push(record);
    }

    tracing::debug!(
        "indexed {} tags, {} platforms, {} extensions ({} disabled)",
        ctx.extension_tags.len(),
        ctx.platforms.len(),
        ctx.extensions.len(),
        ctx.disabled_extensions.len()
    );
    Ok(())
}

fn extension_record(extension: &Element) -> Result<ExtensionRecord> {
    let name = extension
        .attr("name")
        .ok_or_else(|| RegistryError::missing("extension", "name"))?;
    let status = match extension.attr("supported") {
        Some("disabled") => SupportStatus::Disabled,
        _ => SupportStatus::Enabled,
    };
    let required = |kind: &str| -> Vec<String> {
        extension
            .find_all(&format!("require/{}", kind))
            .into_iter()
            .filter_map(|e| e.attr("name"))
            .map(str::to_string)
            .collect()
    };

    Ok(ExtensionRecord {
        name: name.to_string(),
        status,
        platform: extension.attr("platform").map(str::to_string),
        commands: required("command"),
        types: required("type"),
    })
}

fn index_extension(ctx: &mut AnalysisContext, record: &ExtensionRecord) -> Result<()> {
    if record.status == SupportStatus::Disabled {
        ctx.disabled_commands.extend(record.commands.iter().cloned());
        ctx.disabled_types.extend(record.types.iter().cloned());
        ctx.disabled_extensions.insert(record.name.clone());
    }

    if let Some(platform) = &record.platform {
        let guard = ctx
            .platforms
            .get(platform)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownPlatform {
                extension: record.name.clone(),
                platform: platform.clone(),
            })?;
        for command in &record.commands {
            ctx.assign_guard(command, &guard, true);
        }
        for ty in &record.types {
            ctx.assign_guard(ty, &guard, false);
        }
    }
    Ok(())
}
