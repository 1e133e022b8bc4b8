#![allow(dead_code)]

pub use wwatch_test_utils::builders::TaskConfigBuilder;
pub use wwatch_test_utils::fake_process::{FakeProcess, ProcessCall};
pub use wwatch_test_utils::{eventually, init_tracing, with_timeout};

use std::path::PathBuf;

/// Path of a file shipped in `demos/`.
pub fn demo_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}
