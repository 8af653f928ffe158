//! Registry Analysis Engine
//!
//! Runs the pipeline stages in order over a single [`AnalysisContext`]:
//!
//! 1. platform & extension indexing
//! 2. type catalog
//! 3. command classification
//! 4. extension-structure linking
//!
//! Loading the registry and the feature-detection word list happens first, in
//! [`Analyzer::run`]. Everything is synchronous and single-threaded.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog;
use crate::commands;
use crate::config::Config;
use crate::error::Result;
use crate::linker;
use crate::model::{AnalysisContext, ApiModel};
use crate::platform;
use crate::registry::Registry;
use crate::wordlist;

/// Default location of the registry, relative to the working directory
pub const DEFAULT_REGISTRY_PATH: &str = "external/Vulkan-Headers/registry/vk.xml";
/// Default location of the feature-detection header
pub const DEFAULT_WORD_LIST_PATH: &str = "include/feature_detect.h";

/// Analysis input configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub registry_path: PathBuf,
    pub word_list_path: PathBuf,
    /// Continue with an empty word list when the file is missing
    pub word_list_optional: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            word_list_path: PathBuf::from(DEFAULT_WORD_LIST_PATH),
            word_list_optional: false,
        }
    }
}

impl From<&Config> for AnalysisConfig {
    fn from(config: &Config) -> Self {
        Self {
            registry_path: config.input.registry.clone(),
            word_list_path: config.input.word_list.clone(),
            word_list_optional: config.input.word_list_optional,
        }
    }
}

/// Phase of the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisPhase {
    Loading,
    Indexing,
    Cataloguing,
    Classifying,
    Linking,
}

/// Wall-clock time per phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_duration: Duration,
    pub phases: Vec<(AnalysisPhase, Duration)>,
}

impl PerformanceMetrics {
    fn record(&mut self, phase: AnalysisPhase, started: Instant) {
        let elapsed = started.elapsed();
        self.total_duration += elapsed;
        self.phases.push((phase, elapsed));
    }

    pub fn phase_duration(&self, phase: AnalysisPhase) -> Option<Duration> {
        self.phases.iter().find(|(p, _)| *p == phase).map(|(_, d)| *d)
    }
}

/// Result of a full run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub source: String,
    pub model: ApiModel,
    pub metrics: PerformanceMetrics,
}

/// Run every analysis stage over an already loaded registry.
pub fn analyze<S: AsRef<str>>(registry: &Registry, detect_words: &[S]) -> Result<ApiModel> {
    let mut metrics = PerformanceMetrics::default();
    analyze_with_metrics(registry, detect_words, &mut metrics)
}

fn analyze_with_metrics<S: AsRef<str>>(
    registry: &Registry,
    detect_words: &[S],
    metrics: &mut PerformanceMetrics,
) -> Result<ApiModel> {
    let mut ctx = AnalysisContext::new(detect_words.iter().map(|w| w.as_ref().to_string()));

    let started = Instant::now();
    platform::index(registry, &mut ctx)?;
    metrics.record(AnalysisPhase::Indexing, started);

    let started = Instant::now();
    catalog::build(registry, &mut ctx)?;
    metrics.record(AnalysisPhase::Cataloguing, started);

    let started = Instant::now();
    commands::classify(registry, &mut ctx)?;
    metrics.record(AnalysisPhase::Classifying, started);

    let started = Instant::now();
    linker::link(&mut ctx);
    metrics.record(AnalysisPhase::Linking, started);

    Ok(ApiModel::from(ctx))
}

/// Loads the inputs named by an [`AnalysisConfig`] and analyzes them
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(AnalysisConfig::from(config))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self) -> Result<AnalysisReport> {
        tracing::info!("analyzing {}", self.config.registry_path.display());
        let mut metrics = PerformanceMetrics::default();

        let started = Instant::now();
        let words = wordlist::load(&self.config.word_list_path, self.config.word_list_optional)?;
        let registry = Registry::from_file(&self.config.registry_path)?;
        metrics.record(AnalysisPhase::Loading, started);

        let model = analyze_with_metrics(&registry, &words, &mut metrics)?;
        tracing::info!(
            "analysis complete: {} commands, {} structures in {:?}",
            model.functions().len(),
            model.context().structures.len(),
            metrics.total_duration
        );

        Ok(AnalysisReport {
            source: registry.source().to_string(),
            model,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const REGISTRY: &str = r#"<registry>
        <tags><tag name="KHR"/></tags>
        <types>
            <type category="handle"><type>VK_DEFINE_HANDLE</type>(<name>VkInstance</name>)</type>
        </types>
        <commands>
            <command>
                <proto><type>void</type> <name>vkDestroyInstance</name></proto>
                <param optional="true" externsync="true"><type>VkInstance</type> <name>instance</name></param>
                <param optional="true"><type>VkAllocationCallbacks</type>* <name>pAllocator</name></param>
            </command>
        </commands>
    </registry>"#;

    #[test]
    fn test_analyze_in_memory() {
        let registry = Registry::parse(REGISTRY).unwrap();
        let model = analyze(&registry, &["vkDestroyInstance"]).unwrap();

        assert_eq!(
            model.chain_of("vkDestroyInstance"),
            Some(crate::model::InvocationChain::Instance)
        );
        assert!(model.destroyer("vkDestroyInstance").is_some());
        assert!(model.is_externally_synchronized("vkDestroyInstance", "instance"));
        assert!(model.feature_detection_funcs().contains("vkDestroyInstance"));
    }

    #[test]
    fn test_run_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let registry_path = temp_dir.path().join("vk.xml");
        let word_list_path = temp_dir.path().join("feature_detect.h");
        std::fs::File::create(&registry_path)
            .unwrap()
            .write_all(REGISTRY.as_bytes())
            .unwrap();
        std::fs::write(&word_list_path, "bool check_vkDestroyInstance();\n").unwrap();

        let analyzer = Analyzer::new(AnalysisConfig {
            registry_path,
            word_list_path,
            word_list_optional: false,
        });
        let report = analyzer.run().unwrap();

        assert!(report.source.ends_with("vk.xml"));
        assert_eq!(report.model.functions().len(), 1);
        assert!(report.metrics.phase_duration(AnalysisPhase::Loading).is_some());
        assert_eq!(report.metrics.phases.len(), 5);
    }

    #[test]
    fn test_run_missing_registry() {
        let temp_dir = TempDir::new().unwrap();
        let analyzer = Analyzer::new(AnalysisConfig {
            registry_path: temp_dir.path().join("missing.xml"),
            word_list_path: temp_dir.path().join("missing.h"),
            word_list_optional: true,
        });
        assert!(analyzer.run().is_err());
    }
}
