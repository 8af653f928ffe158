mod common;

use std::process::{Command, Output};

use common::TestFixtures;
use tempfile::TempDir;

/// Run the binary from an empty directory with no `VKREGISTRY_*` overrides
fn run(args: &[&str]) -> (Output, TempDir) {
    let work_dir = TempDir::new().unwrap();
    let mut command = Command::new(env!("CARGO_BIN_EXE_vkregistry"));
    command.args(args).current_dir(work_dir.path());
    for key in [
        "VKREGISTRY_REGISTRY",
        "VKREGISTRY_WORD_LIST",
        "VKREGISTRY_WORD_LIST_OPTIONAL",
        "VKREGISTRY_FORMAT",
        "VKREGISTRY_VERBOSE",
        "VKREGISTRY_QUIET",
        "RUST_LOG",
    ] {
        command.env_remove(key);
    }
    let output = command.output().expect("Failed to execute command");
    (output, work_dir)
}

#[test]
fn test_cli_help_output() {
    let (output, _dir) = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--word-list"));
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--verbose"));
    assert!(stdout.contains("--quiet"));
}

#[test]
fn test_cli_version_output() {
    let (output, _dir) = run(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("vkregistry 0.2.0"));
}

#[test]
fn test_cli_json_output() {
    let fixtures = TestFixtures::new();
    let registry = fixtures.registry();
    let word_list = fixtures.word_list();
    let (output, _dir) = run(&[
        registry.to_str().unwrap(),
        "--word-list",
        word_list.to_str().unwrap(),
        "--format",
        "json",
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["functions"].as_array().unwrap().len(), 17);
    assert_eq!(value["unchained"][0], "vkEnumerateInstanceVersion");
    assert_eq!(
        value["creators"]["vkAllocateCommandBuffers"]["count"],
        "commandBufferCount"
    );
    assert_eq!(
        value["extension_structs"][0],
        "VkPhysicalDeviceSynchronization2FeaturesKHR"
    );
}

#[test]
fn test_cli_summary_output() {
    let fixtures = TestFixtures::new();
    let registry = fixtures.registry();
    let word_list = fixtures.word_list();
    let (output, _dir) = run(&[
        registry.to_str().unwrap(),
        "-w",
        word_list.to_str().unwrap(),
        "--format",
        "summary",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Registry Summary:"));
    assert!(stdout.contains("Commands: 17"));
}

#[test]
fn test_cli_missing_registry() {
    let (output, _dir) = run(&["/nonexistent/vk.xml", "--word-list-optional"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Input file not found"));
}

#[test]
fn test_cli_missing_word_list() {
    let fixtures = TestFixtures::new();
    let registry = fixtures.registry();
    let (output, _dir) = run(&[registry.to_str().unwrap(), "--format", "summary"]);

    // the default header path does not exist in the scratch directory
    assert!(!output.status.success());

    let (output, _dir) = run(&[
        registry.to_str().unwrap(),
        "--word-list-optional",
        "--format",
        "summary",
    ]);
    assert!(output.status.success());
}

#[test]
fn test_cli_conflicting_options() {
    let (output, _dir) = run(&["--verbose", "--quiet"]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_config_file() {
    let fixtures = TestFixtures::new();
    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("vkregistry.toml");
    std::fs::write(
        &config_path,
        format!(
            "[input]\nregistry = {:?}\nword_list = {:?}\n\n[output]\nformat = \"json\"\n",
            fixtures.registry().to_str().unwrap(),
            fixtures.word_list().to_str().unwrap()
        ),
    )
    .unwrap();

    let (output, _dir) = run(&["--config", config_path.to_str().unwrap()]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["feature_detection_funcs"][0], "vkQueueSubmit2");
}
