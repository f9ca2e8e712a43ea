#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Write `content` to `dir/rel`, creating parent directories
pub fn write_file(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    write_file(dir, "jobprobe.yaml", content)
}

/// Single-file config with one REST environment and three tagged jobs
pub fn rest_config(url: &str) -> String {
    format!(
        r#"
defaults:
  timeout: 30s
  poll_interval: 1s
output:
  format: console
  console:
    colors: false
environments:
  api:
    type: rest
    url: "{url}"
jobs:
  - name: health
    type: rest
    environment: api
    method: GET
    path: /health
    tags: [smoke]
    assertions:
      status_code: 200
  - name: orders
    type: rest
    environment: api
    method: GET
    path: /orders
    tags: [orders]
    assertions:
      status_code: 200
  - name: status
    type: rest
    environment: api
    method: GET
    path: /status
    tags: [smoke, orders]
    assertions:
      status_code: 200
      json:
        - path: $.status
          equals: ok
"#,
        url = url
    )
}
