#![allow(dead_code)]

use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

#[derive(Debug)]
pub struct BtRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl BtRun {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

pub struct BtWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl BtWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write workspace file");
        path
    }
}

pub fn run_bt<I, S>(workspace: &BtWorkspace, args: I, label: &str) -> BtRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_bt_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_bt_with_env<I, S, E, K, V>(
    workspace: &BtWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> BtRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bt"));
    cmd.current_dir(&workspace.root);
    cmd.env_remove("BT_CONFIG");
    cmd.env_remove("BT_DATABASE");
    cmd.env_remove("BT_READ_POOL_SIZE");
    cmd.env_remove("BT_CUSTOMER_TRACKER_ID");
    cmd.args(args);
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "bug_trends=debug");
    cmd.env("RUST_BACKTRACE", "1");

    let start = Instant::now();
    let output = cmd.output().expect("run bt");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let timestamp = SystemTime::now();
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        timestamp,
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    BtRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

pub fn extract_json_payload(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    stdout.trim().to_string()
}
