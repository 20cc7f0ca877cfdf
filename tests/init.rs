use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_deploylens"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "deploylens init failed: {}", String::from_utf8_lossy(&output.stderr));

    let config_path = dir.path().join(".deploylens.toml");
    assert!(config_path.exists(), ".deploylens.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[analysis]"));
    assert!(content.contains("[scoring]"));
    assert!(content.contains("[runbook]"));

    // The template must load with every value at its default
    let _raw: toml::Table = toml::from_str(&content).unwrap();
    let config = deploylens_core::DeployLensConfig::from_toml(&content).unwrap();
    assert_eq!(config.scoring, deploylens_core::ScoringConfig::default());
    assert!(config.rules.is_empty());
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".deploylens.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_deploylens"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".deploylens.toml")).unwrap();
    assert_eq!(content, "# existing");
}
