#![allow(dead_code)]

use std::path::PathBuf;

use vkregistry::{ApiModel, Registry, analyze, wordlist};

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn registry(&self) -> PathBuf {
        self.fixtures_dir.join("mini_vk.xml")
    }

    pub fn word_list(&self) -> PathBuf {
        self.fixtures_dir.join("feature_detect.h")
    }
}

/// Analyze the fixture registry with the fixture word list
pub fn fixture_model() -> ApiModel {
    let fixtures = TestFixtures::new();
    let registry = Registry::from_file(&fixtures.registry()).unwrap();
    let words = wordlist::load(&fixtures.word_list(), false).unwrap();
    analyze(&registry, &words).unwrap()
}

/// Wrap type and command declarations in a minimal registry document
pub fn registry_with(tags: &[&str], types: &str, commands: &str) -> String {
    let tags: String = tags
        .iter()
        .map(|t| format!("<tag name=\"{}\"/>", t))
        .collect();
    format!(
        "<registry><tags>{}</tags><types>{}</types><commands>{}</commands></registry>",
        tags, types, commands
    )
}
