//! # vkregistry Library
//!
//! Reads the Vulkan API registry (`vk.xml`) and classifies it into the model a
//! loader/dispatch code generator needs: invocation chains, handle lifecycles,
//! count-then-fill queries, external synchronization requirements, platform
//! guards, storage types and the structures that extend other structures.
//!
//! ```no_run
//! use vkregistry::{Registry, analyze, wordlist};
//! use std::path::Path;
//!
//! # fn main() -> vkregistry::Result<()> {
//! let registry = Registry::from_file(Path::new("vk.xml"))?;
//! let words = wordlist::load(Path::new("feature_detect.h"), true)?;
//! let model = analyze(&registry, &words)?;
//! println!("{} commands", model.functions().len());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod libxml2;
pub mod linker;
pub mod model;
pub mod output;
pub mod overrides;
pub mod platform;
pub mod registry;
pub mod wordlist;

pub use analyzer::{
    AnalysisConfig, AnalysisPhase, AnalysisReport, Analyzer, PerformanceMetrics, analyze,
};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{LoadError, RegistryError, Result};
pub use libxml2::LibXml2Wrapper;
pub use model::{
    AnalysisContext, ApiModel, Diagnostics, ExternSync, HandleCount, HandleLifecycle,
    InvocationChain, QueryTwice,
};
pub use output::Output;
pub use registry::{Element, Registry};
