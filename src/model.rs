//! Analysis context and the data it accumulates
//!
//! [`AnalysisContext`] is threaded through the pipeline stages in order. Each stage
//! only appends; nothing is removed or rewritten once recorded, with the single
//! exception of platform guards (last write wins, see [`AnalysisContext::assign_guard`]).
//! The finished context is frozen into an [`ApiModel`].

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};

use crate::overrides::MANUAL_TYPE_MAPPINGS;

/// Vendor codes accepted even though they are registered tags
const ACCEPTED_TAGS: &[&str] = &["KHR", "EXT"];
/// Vendor codes carved out of the suffix rule
const CARVED_OUT_TAGS: &[&str] = &["GOOGLE", "ARM"];

/// Registered vendor/author tags, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(IndexSet<String>);

impl TagSet {
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether `name` belongs to a vendor-only extension.
    pub fn is_vendor(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        if ACCEPTED_TAGS.iter().any(|t| name.contains(t)) {
            return false;
        }
        if CARVED_OUT_TAGS.iter().any(|t| name.contains(t)) {
            return false;
        }
        self.0.iter().any(|t| name.ends_with(t.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionRecord {
    pub name: String,
    pub status: SupportStatus,
    pub platform: Option<String>,
    pub commands: Vec<String>,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructInfo {
    pub name: String,
    pub structure_type: Option<String>,
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleInfo {
    pub name: String,
    pub dispatchable: bool,
    pub parents: Vec<String>,
}

/// Type name to underlying storage type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMapping {
    entries: IndexMap<String, String>,
    #[serde(skip)]
    manual: IndexSet<String>,
}

impl TypeMapping {
    pub fn with_manual_overrides() -> Self {
        let mut mapping = Self {
            entries: IndexMap::new(),
            manual: IndexSet::new(),
        };
        for (name, storage) in MANUAL_TYPE_MAPPINGS {
            mapping.entries.insert(name.to_string(), storage.to_string());
            mapping.manual.insert(name.to_string());
        }
        mapping
    }

    /// Record an inferred mapping. Manual entries are never replaced; returns
    /// whether the mapping was stored.
    pub fn seed(&mut self, name: &str, storage: &str) -> bool {
        if self.manual.contains(name) {
            return false;
        }
        self.entries.insert(name.to_string(), storage.to_string());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn is_manual(&self, name: &str) -> bool {
        self.manual.contains(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for TypeMapping {
    fn default() -> Self {
        Self::with_manual_overrides()
    }
}

/// A command parameter as declared in the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: Option<String>,
    pub ty: String,
    pub optional: Option<String>,
    pub externsync: Option<String>,
}

/// Alias name to target name, plus the reverse multi-map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasIndex {
    targets: IndexMap<String, String>,
    aliases: IndexMap<String, Vec<String>>,
}

impl AliasIndex {
    /// Record `alias -> target`. An alias already pointing elsewhere keeps its
    /// first target; returns whether the alias was recorded.
    pub fn insert(&mut self, alias: &str, target: &str) -> bool {
        if self.targets.contains_key(alias) {
            return false;
        }
        self.targets.insert(alias.to_string(), target.to_string());
        self.aliases
            .entry(target.to_string())
            .or_default()
            .push(alias.to_string());
        true
    }

    pub fn target_of(&self, alias: &str) -> Option<&str> {
        self.targets.get(alias).map(String::as_str)
    }

    pub fn aliases_of(&self, target: &str) -> &[String] {
        self.aliases.get(target).map_or(&[], Vec::as_slice)
    }

    /// Canonical name for `name`; canonical names resolve to themselves.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.target_of(name).unwrap_or(name)
    }

    pub fn is_target(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.targets.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationChain {
    Instance,
    Device,
    Unchained,
}

impl fmt::Display for InvocationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationChain::Instance => write!(f, "instance"),
            InvocationChain::Device => write!(f, "device"),
            InvocationChain::Unchained => write!(f, "unchained"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayOutput {
    pub name: String,
    pub ty: String,
}

/// A count-then-fill query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTwice {
    pub count_name: String,
    pub count_type: String,
    pub outputs: Vec<ArrayOutput>,
}

/// Number of handles a create/destroy call handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleCount {
    Single,
    Parameter(String),
}

impl fmt::Display for HandleCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleCount::Single => write!(f, "1"),
            HandleCount::Parameter(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for HandleCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleLifecycle {
    pub handle_name: String,
    pub count: HandleCount,
    pub handle_type: String,
}

/// (command or structure, parameter or member) that needs external synchronization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExternSync {
    pub owner: String,
    pub member: String,
}

impl ExternSync {
    pub fn new(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            member: member.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardConflict {
    pub name: String,
    pub previous: String,
    pub current: String,
}

/// Things skipped or worth a second look, collected while analyzing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Platform-guarded structures left out of extension-structure analysis
    pub guarded_structs: Vec<String>,
    pub guard_conflicts: Vec<GuardConflict>,
    pub opaque_basetypes: Vec<String>,
    pub skipped_alias_handles: usize,
    pub skipped_alias_bitmasks: usize,
    pub skipped_vendor_handles: usize,
    pub skipped_vendor_aliases: usize,
    pub skipped_disabled_commands: usize,
}

/// Accumulated state of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisContext {
    pub detect_words: IndexSet<String>,

    pub extension_tags: TagSet,
    pub platforms: IndexMap<String, String>,
    pub extensions: Vec<ExtensionRecord>,
    pub disabled_extensions: IndexSet<String>,
    pub disabled_commands: IndexSet<String>,
    pub disabled_types: IndexSet<String>,
    pub command_guards: IndexMap<String, String>,
    pub type_guards: IndexMap<String, String>,

    pub structures: IndexMap<String, StructInfo>,
    pub structure_types: IndexMap<String, String>,
    /// Structures declaring `structextends` that passed the catalog filters
    pub extending_structs: IndexMap<String, Vec<String>>,
    pub handles: IndexMap<String, HandleInfo>,
    pub type_mappings: TypeMapping,
    pub feature_detection_structs: IndexSet<String>,

    pub aliases: AliasIndex,
    pub functions: IndexSet<String>,
    pub instance_chain: IndexSet<String>,
    pub device_chain: IndexSet<String>,
    pub unchained: IndexSet<String>,
    pub query_twice: IndexMap<String, QueryTwice>,
    pub creators: IndexMap<String, HandleLifecycle>,
    pub destroyers: IndexMap<String, HandleLifecycle>,
    pub externally_synchronized: IndexSet<ExternSync>,
    pub feature_detection_funcs: IndexSet<String>,

    pub extension_structs: IndexSet<String>,

    pub diagnostics: Diagnostics,
}

impl AnalysisContext {
    pub fn new<I, S>(detect_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            detect_words: detect_words.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_vendor(&self, name: &str) -> bool {
        self.extension_tags.is_vendor(name)
    }

    /// Assign a guard symbol, warning when a different guard already claimed the name.
    pub(crate) fn assign_guard(&mut self, name: &str, guard: &str, is_command: bool) {
        let map = if is_command {
            &mut self.command_guards
        } else {
            &mut self.type_guards
        };
        if let Some(previous) = map.insert(name.to_string(), guard.to_string())
            && previous != guard
        {
            tracing::warn!(
                "{} is claimed by two platform guards ({} and {}); keeping {}",
                name,
                previous,
                guard,
                guard
            );
            self.diagnostics.guard_conflicts.push(GuardConflict {
                name: name.to_string(),
                previous,
                current: guard.to_string(),
            });
        }
    }

    pub(crate) fn chain_mut(&mut self, chain: InvocationChain) -> &mut IndexSet<String> {
        match chain {
            InvocationChain::Instance => &mut self.instance_chain,
            InvocationChain::Device => &mut self.device_chain,
            InvocationChain::Unchained => &mut self.unchained,
        }
    }
}

/// The finished, read-only result of an analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiModel {
    ctx: AnalysisContext,
}

impl From<AnalysisContext> for ApiModel {
    fn from(ctx: AnalysisContext) -> Self {
        Self { ctx }
    }
}

impl ApiModel {
    pub fn context(&self) -> &AnalysisContext {
        &self.ctx
    }

    pub fn chain(&self, chain: InvocationChain) -> &IndexSet<String> {
        match chain {
            InvocationChain::Instance => &self.ctx.instance_chain,
            InvocationChain::Device => &self.ctx.device_chain,
            InvocationChain::Unchained => &self.ctx.unchained,
        }
    }

    pub fn chain_of(&self, command: &str) -> Option<InvocationChain> {
        [
            InvocationChain::Instance,
            InvocationChain::Device,
            InvocationChain::Unchained,
        ]
        .into_iter()
        .find(|c| self.chain(*c).contains(command))
    }

    /// Every classified command in chain order: instance, device, unchained.
    pub fn all_commands(&self) -> impl Iterator<Item = (&str, InvocationChain)> {
        [
            InvocationChain::Instance,
            InvocationChain::Device,
            InvocationChain::Unchained,
        ]
        .into_iter()
        .flat_map(move |c| self.chain(c).iter().map(move |n| (n.as_str(), c)))
    }

    pub fn functions(&self) -> &IndexSet<String> {
        &self.ctx.functions
    }

    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.ctx.aliases.resolve(name)
    }

    pub fn aliases(&self) -> &AliasIndex {
        &self.ctx.aliases
    }

    pub fn storage_type(&self, name: &str) -> Option<&str> {
        self.ctx.type_mappings.get(name)
    }

    pub fn type_mappings(&self) -> &TypeMapping {
        &self.ctx.type_mappings
    }

    pub fn structure_type(&self, name: &str) -> Option<&str> {
        self.ctx.structure_types.get(name).map(String::as_str)
    }

    pub fn is_extension_struct(&self, name: &str) -> bool {
        self.ctx.extension_structs.contains(name)
    }

    pub fn extension_structs(&self) -> &IndexSet<String> {
        &self.ctx.extension_structs
    }

    pub fn is_externally_synchronized(&self, owner: &str, member: &str) -> bool {
        self.ctx
            .externally_synchronized
            .contains(&ExternSync::new(owner, member))
    }

    pub fn externally_synchronized(&self) -> &IndexSet<ExternSync> {
        &self.ctx.externally_synchronized
    }

    pub fn guard_for_command(&self, name: &str) -> Option<&str> {
        self.ctx.command_guards.get(name).map(String::as_str)
    }

    pub fn guard_for_type(&self, name: &str) -> Option<&str> {
        self.ctx.type_guards.get(name).map(String::as_str)
    }

    pub fn query_twice(&self, name: &str) -> Option<&QueryTwice> {
        self.ctx.query_twice.get(name)
    }

    pub fn creator(&self, name: &str) -> Option<&HandleLifecycle> {
        self.ctx.creators.get(name)
    }

    pub fn destroyer(&self, name: &str) -> Option<&HandleLifecycle> {
        self.ctx.destroyers.get(name)
    }

    pub fn handle(&self, name: &str) -> Option<&HandleInfo> {
        self.ctx.handles.get(name)
    }

    pub fn dispatchable_handles(&self) -> impl Iterator<Item = &str> {
        self.ctx
            .handles
            .values()
            .filter(|h| h.dispatchable)
            .map(|h| h.name.as_str())
    }

    pub fn non_dispatchable_handles(&self) -> impl Iterator<Item = &str> {
        self.ctx
            .handles
            .values()
            .filter(|h| !h.dispatchable)
            .map(|h| h.name.as_str())
    }

    /// Count-like parameters of a command or structure; aliases use their target's.
    pub fn count_like_parameters(&self, name: &str) -> &'static [&'static str] {
        crate::overrides::count_like(self.resolve_alias(name))
    }

    pub fn feature_detection_structs(&self) -> &IndexSet<String> {
        &self.ctx.feature_detection_structs
    }

    pub fn feature_detection_funcs(&self) -> &IndexSet<String> {
        &self.ctx.feature_detection_funcs
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.ctx.diagnostics
    }
}
