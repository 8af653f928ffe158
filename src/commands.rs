//! Command classification
//!
//! Two passes over `commands/command`. The first builds the alias index; the
//! second classifies every canonical command and, against the same parameter
//! list, each of its aliases. Alias declarations carry no parameters, so each
//! detection only ever sees an [`EffectiveCommand`].

use crate::error::{RegistryError, Result};
use crate::model::{
    AnalysisContext, ArrayOutput, ExternSync, HandleCount, HandleLifecycle, InvocationChain,
    Param, QueryTwice,
};
use crate::overrides;
use crate::registry::{Element, Registry};

/// Parameter types that put a command on the instance chain
pub const INSTANCE_CHAIN_TYPES: &[&str] = &["VkInstance", "VkPhysicalDevice"];
/// Parameter types that put a command on the device chain
pub const DEVICE_CHAIN_TYPES: &[&str] = &["VkDevice", "VkQueue", "VkCommandBuffer"];

const COUNT_TOKENS: &[&str] = &["Count", "Size"];
const QUERY_PREFIXES: &[&str] = &["vkGet", "vkEnum"];
const CREATE_PREFIXES: &[&str] = &["vkCreate", "vkAllocate"];
const DESTROY_PREFIXES: &[&str] = &["vkFree", "vkDestroy"];
const ALLOCATOR_PARAM: &str = "pAllocator";

/// A canonical command declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDecl {
    pub name: String,
    pub params: Vec<Param>,
}

/// The parameter list of a canonical command together with every name for it
#[derive(Debug, Clone, Copy)]
pub struct EffectiveCommand<'a> {
    pub canonical: &'a str,
    pub params: &'a [Param],
    pub aliases: &'a [String],
}

impl<'a> EffectiveCommand<'a> {
    /// The canonical name followed by its aliases
    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        std::iter::once(self.canonical).chain(self.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Create(HandleLifecycle),
    Destroy(HandleLifecycle),
}

/// Everything derived for one command name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub chain: InvocationChain,
    pub query_twice: Option<QueryTwice>,
    pub lifecycle: Option<Lifecycle>,
    pub externally_synchronized: Vec<ExternSync>,
}

/// Classify all commands into `ctx`. Requires the platform index and the word list.
pub fn classify(registry: &Registry, ctx: &mut AnalysisContext) -> Result<()> {
    for (owner, member) in overrides::externally_synchronized() {
        ctx.externally_synchronized
            .insert(ExternSync::new(owner, member));
    }

    let nodes = registry.find_all("commands/command");
    index_aliases(&nodes, ctx)?;

    for node in nodes {
        if node.attr("alias").is_some() {
            continue;
        }
        let decl = parse_command(node)?;
        if ctx.disabled_commands.contains(&decl.name) {
            ctx.diagnostics.skipped_disabled_commands += 1;
            continue;
        }

        let aliases = ctx.aliases.aliases_of(&decl.name).to_vec();
        let effective = EffectiveCommand {
            canonical: &decl.name,
            params: &decl.params,
            aliases: &aliases,
        };
        for name in effective.names() {
            let classification = classify_command(name, &effective)?;
            record(ctx, name, classification);
        }
    }

    tracing::debug!(
        "classified {} commands: {} instance, {} device, {} unchained, {} aliases",
        ctx.functions.len(),
        ctx.instance_chain.len(),
        ctx.device_chain.len(),
        ctx.unchained.len(),
        ctx.aliases.len()
    );
    Ok(())
}

fn index_aliases(nodes: &[&Element], ctx: &mut AnalysisContext) -> Result<()> {
    for node in nodes {
        let Some(target) = node.attr("alias") else {
            continue;
        };
        let name = node
            .attr("name")
            .ok_or_else(|| RegistryError::missing(format!("alias of {}", target), "name"))?;

        if ctx.is_vendor(name) {
            ctx.diagnostics.skipped_vendor_aliases += 1;
            continue;
        }
        if ctx.disabled_commands.contains(name) || ctx.disabled_commands.contains(target) {
            ctx.diagnostics.skipped_disabled_commands += 1;
            continue;
        }
        if !ctx.aliases.insert(name, target) && ctx.aliases.target_of(name) != Some(target) {
            tracing::warn!(
                "{} is declared as an alias of both {} and {}; keeping the first",
                name,
                ctx.aliases.target_of(name).unwrap_or_default(),
                target
            );
        }
    }
    Ok(())
}

/// Parse a non-alias `<command>` element.
pub fn parse_command(node: &Element) -> Result<CommandDecl> {
    let name = node
        .child("proto")
        .and_then(|p| p.child_text("name"))
        .ok_or_else(|| RegistryError::missing("command", "proto/name"))?
        .to_string();

    let params = node
        .children_named("param")
        .map(|p| {
            let ty = p
                .child_text("type")
                .ok_or_else(|| RegistryError::missing(format!("parameter of {}", name), "type"))?;
            Ok(Param {
                name: p.child_text("name").map(str::to_string),
                ty: ty.to_string(),
                optional: p.attr("optional").map(str::to_string),
                externsync: p.attr("externsync").map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CommandDecl { name, params })
}

/// Run every detection for `name` against the effective command's parameters.
pub fn classify_command(name: &str, command: &EffectiveCommand<'_>) -> Result<Classification> {
    Ok(Classification {
        chain: detect_chain(command.params),
        query_twice: detect_query_twice(name, command.canonical, command.params),
        lifecycle: detect_lifecycle(name, command.canonical, command.params),
        externally_synchronized: detect_extern_sync(name, command.params)?,
    })
}

fn record(ctx: &mut AnalysisContext, name: &str, classification: Classification) {
    if !ctx.functions.insert(name.to_string()) {
        tracing::debug!("{} declared more than once, keeping the first declaration", name);
        return;
    }
    if ctx.detect_words.contains(name) {
        ctx.feature_detection_funcs.insert(name.to_string());
    }
    ctx.chain_mut(classification.chain).insert(name.to_string());

    if let Some(query) = classification.query_twice {
        ctx.query_twice.insert(name.to_string(), query);
    }
    match classification.lifecycle {
        Some(Lifecycle::Create(lifecycle)) => {
            ctx.creators.insert(name.to_string(), lifecycle);
        }
        Some(Lifecycle::Destroy(lifecycle)) => {
            ctx.destroyers.insert(name.to_string(), lifecycle);
        }
        None => {}
    }
    ctx.externally_synchronized
        .extend(classification.externally_synchronized);
}

fn has_count_token(name: &str) -> bool {
    COUNT_TOKENS.iter().any(|t| name.contains(t))
}

fn matches_prefix(name: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| name.contains(p))
}

/// First parameter typed as an instance- or device-level handle decides.
pub fn detect_chain(params: &[Param]) -> InvocationChain {
    for param in params {
        if INSTANCE_CHAIN_TYPES.contains(&param.ty.as_str()) {
            return InvocationChain::Instance;
        }
        if DEVICE_CHAIN_TYPES.contains(&param.ty.as_str()) {
            return InvocationChain::Device;
        }
    }
    InvocationChain::Unchained
}

/// A count parameter of a query-twice call is optional on the second call only,
/// which the registry spells as `optional="false,true"`.
fn is_query_count(param: &Param) -> bool {
    let Some(optional) = param.optional.as_deref() else {
        return false;
    };
    if !optional.contains("true") || !optional.contains("false") {
        return false;
    }
    param.name.as_deref().is_some_and(has_count_token)
        && (param.ty == "uint32_t" || param.ty == "size_t")
}

pub fn detect_query_twice(name: &str, canonical: &str, params: &[Param]) -> Option<QueryTwice> {
    if !matches_prefix(name, QUERY_PREFIXES) {
        return None;
    }
    let count = params.iter().filter(|p| is_query_count(p)).last()?;
    let last = params.last()?;
    let last_name = last.name.clone()?;
    let last_type = if last.ty == "void" { "char" } else { last.ty.as_str() };

    let mut outputs: Vec<ArrayOutput> = overrides::leading_outputs(canonical)
        .iter()
        .map(|(name, ty)| ArrayOutput {
            name: name.to_string(),
            ty: ty.to_string(),
        })
        .collect();
    outputs.push(ArrayOutput {
        name: last_name,
        ty: last_type.to_string(),
    });

    Some(QueryTwice {
        count_name: count.name.clone()?,
        count_type: count.ty.clone(),
        outputs,
    })
}

pub fn detect_lifecycle(name: &str, canonical: &str, params: &[Param]) -> Option<Lifecycle> {
    let destroys = matches_prefix(name, DESTROY_PREFIXES);
    if !destroys && !matches_prefix(name, CREATE_PREFIXES) {
        return None;
    }

    let count = match overrides::handle_count(canonical) {
        Some(param) => HandleCount::Parameter(param.to_string()),
        None => params
            .iter()
            .filter(|p| p.ty == "uint32_t")
            .filter_map(|p| p.name.as_deref())
            .filter(|n| has_count_token(n))
            .last()
            .map_or(HandleCount::Single, |n| HandleCount::Parameter(n.to_string())),
    };

    let handle = params
        .iter()
        .filter(|p| p.name.as_deref().is_some_and(|n| n != ALLOCATOR_PARAM))
        .last();
    let Some(handle) = handle else {
        tracing::debug!("{} has no handle parameter, not recorded as create/destroy", name);
        return None;
    };

    let lifecycle = HandleLifecycle {
        handle_name: handle.name.clone().unwrap_or_default(),
        count,
        handle_type: handle.ty.clone(),
    };
    Some(if destroys {
        Lifecycle::Destroy(lifecycle)
    } else {
        Lifecycle::Create(lifecycle)
    })
}

pub fn detect_extern_sync(name: &str, params: &[Param]) -> Result<Vec<ExternSync>> {
    let mut found = Vec::new();
    for param in params {
        let Some(externsync) = param.externsync.as_deref() else {
            continue;
        };
        if externsync == "true" {
            let param_name = param
                .name
                .as_deref()
                .ok_or_else(|| RegistryError::missing(format!("parameter of {}", name), "name"))?;
            found.push(ExternSync::new(name, param_name));
            continue;
        }
        for expression in externsync.split(',') {
            let member = referenced_member(expression).ok_or_else(|| {
                RegistryError::ExternSyncFormat {
                    command: name.to_string(),
                    expression: expression.to_string(),
                }
            })?;
            found.push(ExternSync::new(param.ty.as_str(), member));
        }
    }
    Ok(found)
}

/// Member named by an `externsync` path: `pInfo->member`, `pInfos[]->member`
/// or `pInfos[].member`.
fn referenced_member(expression: &str) -> Option<String> {
    if expression.contains('>') {
        let cleaned = expression.replace("[]", "");
        cleaned.split('>').nth(1).map(str::to_string)
    } else if expression.contains('[') {
        expression.split('.').nth(1).map(str::to_string)
    } else {
        None
    }
}
