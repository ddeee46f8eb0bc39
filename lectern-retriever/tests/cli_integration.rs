use anyhow::Result;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI binary with given args
fn run_cli(temp_dir: &TempDir, args: &[&str]) -> Result<std::process::Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lectern"));
    cmd.arg("--config")
        .arg(temp_dir.path().join("lectern.toml"))
        .arg("--index-dir")
        .arg(temp_dir.path().join("index"))
        .args(args)
        .env("RUST_LOG", "error"); // Reduce log noise

    let output = cmd.output()?;
    Ok(output)
}

/// Helper to write a hashing-encoder config and a small document
fn populate_test_data(temp_dir: &TempDir) -> Result<()> {
    std::fs::write(
        temp_dir.path().join("lectern.toml"),
        r#"
top_k = 2

[chunking]
strategy = "sentence"
max_chars = 60
overlap_sentences = 0

[encoder]
provider = "hash"
dimension = 128
"#,
    )?;
    std::fs::write(
        temp_dir.path().join("notes.txt"),
        "Rust guarantees memory safety without a garbage collector. \
         Bread rises because yeast ferments sugar into gas. \
         Ownership and borrowing give Rust memory safety.",
    )?;
    Ok(())
}

fn build_index(temp_dir: &TempDir) -> Result<()> {
    let input = temp_dir.path().join("notes.txt");
    let output = run_cli(
        temp_dir,
        &["build", "--input", input.to_str().unwrap(), "--prefix", "notes"],
    )?;
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Indexed 3 passages"), "stdout: {stdout}");
    Ok(())
}

#[test]
fn test_cli_build_writes_manifest() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_test_data(&temp_dir)?;
    build_index(&temp_dir)?;

    assert!(Path::new(&temp_dir.path().join("index").join("manifest.json")).exists());
    Ok(())
}

#[test]
fn test_cli_query_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_test_data(&temp_dir)?;
    build_index(&temp_dir)?;

    let output = run_cli(
        &temp_dir,
        &["query", "rust memory safety", "--format", "json"],
    )?;
    assert!(output.status.success());

    let results: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(results.len(), 2); // top_k from the config file
    for result in &results {
        assert!(result["id"].as_str().unwrap().starts_with("notes_"));
        assert!(result["text"].as_str().unwrap().contains("Rust"));
        assert!(result["score"].as_f64().unwrap() <= 1.0);
    }

    let output = run_cli(
        &temp_dir,
        &["query", "yeast bread", "--top-k", "1", "--format", "json"],
    )?;
    let results: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "notes_000001");
    Ok(())
}

#[test]
fn test_cli_query_without_index_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_test_data(&temp_dir)?;

    let output = run_cli(&temp_dir, &["query", "anything"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
    Ok(())
}

#[test]
fn test_cli_stats() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_test_data(&temp_dir)?;

    let output = run_cli(&temp_dir, &["stats", "--format", "json"])?;
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["state"], "unloaded");
    assert_eq!(stats["entries"], 0);

    build_index(&temp_dir)?;
    let output = run_cli(&temp_dir, &["stats", "--format", "json"])?;
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["state"], "ready");
    assert_eq!(stats["entries"], 3);
    assert_eq!(stats["dimension"], 128);
    assert_eq!(stats["encoder"]["provider"], "hash");
    assert!(stats["created_at"].is_string());
    Ok(())
}

#[test]
fn test_cli_invalid_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    std::fs::write(temp_dir.path().join("lectern.toml"), "top_k = 0\n")?;

    let output = run_cli(&temp_dir, &["stats"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("top_k"));
    Ok(())
}

#[test]
fn test_cli_query_rejects_zero_top_k() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_test_data(&temp_dir)?;
    build_index(&temp_dir)?;

    let output = run_cli(&temp_dir, &["query", "rust", "--top-k", "0"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("top-k"));
    assert!(output.stdout.is_empty());
    Ok(())
}
