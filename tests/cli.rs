use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn indexer_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("synapstor-index");
    path
}

/// Project tree plus a config that needs no network model download:
/// in-memory store and an Ollama provider pointed at a closed port.
fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let project = root.join("project");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::write(project.join("README.md"), "# Demo\n\nA tiny project.").unwrap();
    fs::write(project.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(project.join("logo.png"), b"\x89PNG\r\n\x1a\n").unwrap();

    let config_path = root.join("synapstor.toml");
    fs::write(
        &config_path,
        r#"[store]
backend = "memory"

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 8
url = "http://127.0.0.1:9"
timeout_secs = 2

[indexing]
collection = "cli-test"
"#,
    )
    .unwrap();

    (tmp, project, config_path)
}

fn run_indexer(args: &[&str]) -> (String, String, Option<i32>) {
    let binary = indexer_binary();
    let output = Command::new(&binary)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("QDRANT_URL")
        .env_remove("QDRANT_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run indexer binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code())
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_help() {
    let (stdout, _, code) = run_indexer(&["--help"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("--project"));
    assert!(stdout.contains("--path"));
    assert!(stdout.contains("--recreate-collection"));
}

#[test]
fn test_project_and_path_are_required() {
    let (_, stderr, code) = run_indexer(&["--project", "demo"]);
    assert_ne!(code, Some(0));
    assert!(stderr.contains("--path"));
}

#[test]
fn test_missing_path_is_setup_failure() {
    let (_tmp, project, config) = setup_test_env();
    let missing = project.join("does-not-exist");
    let (stdout, stderr, code) = run_indexer(&[
        "--config",
        path_arg(&config),
        "-p",
        "demo",
        "-d",
        path_arg(&missing),
    ]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
    assert!(!stdout.contains("Files found"));
}

#[test]
fn test_openai_without_key_is_setup_failure() {
    let (_tmp, project, _) = setup_test_env();
    let (_, stderr, code) = run_indexer(&[
        "--store",
        "memory",
        "--embedding-provider",
        "openai",
        "-p",
        "demo",
        "-d",
        path_arg(&project),
    ]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("embedding provider unavailable"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_store_backend_is_rejected() {
    let (_tmp, project, config) = setup_test_env();
    let (_, stderr, code) = run_indexer(&[
        "--config",
        path_arg(&config),
        "--store",
        "sqlite",
        "-p",
        "demo",
        "-d",
        path_arg(&project),
    ]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("sqlite"), "stderr: {}", stderr);
}

#[test]
fn test_per_file_failures_still_exit_zero() {
    let (_tmp, project, config) = setup_test_env();
    let (stdout, _, code) = run_indexer(&[
        "--config",
        path_arg(&config),
        "--progress",
        "off",
        "-p",
        "demo",
        "-d",
        path_arg(&project),
        "--query",
        "tiny project",
    ]);

    // Embedding fails for every file and for the query, but setup succeeded.
    assert_eq!(code, Some(0), "stdout: {}", stdout);
    assert!(stdout.contains("Indexing summary for 'demo'"));
    assert!(stdout.contains("Files found:       3"));
    assert!(stdout.contains("Processable files: 2"));
    assert!(stdout.contains("Indexed files:     0"));
    assert!(stdout.contains("Failed files:      2"));
    assert!(!stdout.contains("Results for"));
}

#[cfg(unix)]
#[test]
fn test_interrupt_during_setup_exits_one() {
    use std::net::TcpListener;
    use std::process::Stdio;
    use std::time::Duration;

    let (tmp, project, _) = setup_test_env();
    // Accepts connections but never answers, so collection setup hangs.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let config = tmp.path().join("stalled.toml");
    fs::write(
        &config,
        format!(
            r#"[store]
backend = "qdrant"
url = "http://{}"
timeout_secs = 60

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 8
"#,
            listener.local_addr().unwrap()
        ),
    )
    .unwrap();

    let binary = indexer_binary();
    let child = Command::new(&binary)
        .args([
            "--config",
            path_arg(&config),
            "--progress",
            "off",
            "-p",
            "demo",
            "-d",
            path_arg(&project),
        ])
        .env_remove("RUST_LOG")
        .env_remove("QDRANT_URL")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run indexer binary at {:?}: {}", binary, e));

    std::thread::sleep(Duration::from_millis(1500));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
    assert!(stderr.contains("interrupted"), "stderr: {}", stderr);
}
