// tests/watch_walk.rs

mod common;

use common::init_tracing;

use std::error::Error;
use std::path::PathBuf;

use regex::Regex;
use wwatch::errors::WwatchError;
use wwatch::fs::mock::MockFileSystem;
use wwatch::fs::RealFileSystem;
use wwatch::watch::{collect_watch_dirs, WalkOptions};

type TestResult = Result<(), Box<dyn Error>>;

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("proj/main.go", "package main");
    fs.add_file("proj/src/lib.go", "package src");
    fs.add_dir("proj/src/nested/deeper");
    fs.add_dir("proj/.git/objects");
    fs.add_dir("proj/node_modules/left-pad");
    fs.add_dir_symlink("proj/linked");
    fs
}

fn opts(recursive: bool, dotfiles: bool, ignore: Option<&Regex>) -> WalkOptions<'_> {
    WalkOptions {
        recursive,
        dotfiles,
        ignore,
    }
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

#[test]
fn non_recursive_watches_root_only() -> TestResult {
    init_tracing();
    let fs = project();

    let dirs = collect_watch_dirs(&fs, "proj".as_ref(), opts(false, false, None))?;
    assert_eq!(dirs, paths(&["proj"]));
    Ok(())
}

#[test]
fn recursive_skips_dot_directories_and_symlinks() -> TestResult {
    let fs = project();

    let dirs = collect_watch_dirs(&fs, "proj".as_ref(), opts(true, false, None))?;
    assert_eq!(
        dirs,
        paths(&[
            "proj",
            "proj/node_modules",
            "proj/node_modules/left-pad",
            "proj/src",
            "proj/src/nested",
            "proj/src/nested/deeper",
        ])
    );
    Ok(())
}

#[test]
fn visible_dotfiles_include_dot_directories() -> TestResult {
    let fs = project();

    let dirs = collect_watch_dirs(&fs, "proj".as_ref(), opts(true, true, None))?;
    assert!(dirs.contains(&PathBuf::from("proj/.git")));
    assert!(dirs.contains(&PathBuf::from("proj/.git/objects")));
    assert!(!dirs.contains(&PathBuf::from("proj/linked")));
    Ok(())
}

#[test]
fn ignored_directory_hides_its_subtree() -> TestResult {
    let fs = project();
    let ignore = Regex::new("node_modules")?;

    let dirs = collect_watch_dirs(&fs, "proj".as_ref(), opts(true, false, Some(&ignore)))?;
    assert!(dirs.iter().all(|d| !d.starts_with("proj/node_modules")));
    assert!(dirs.contains(&PathBuf::from("proj/src/nested")));
    Ok(())
}

#[test]
fn dot_named_root_is_still_watched() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_dir(".config/app");

    let dirs = collect_watch_dirs(&fs, ".config".as_ref(), opts(true, false, None))?;
    assert_eq!(dirs, paths(&[".config", ".config/app"]));
    Ok(())
}

#[test]
fn unreadable_subdirectory_is_skipped() -> TestResult {
    init_tracing();
    let fs = project();
    fs.add_unreadable_dir("proj/src/locked");

    let dirs = collect_watch_dirs(&fs, "proj".as_ref(), opts(true, false, None))?;
    assert!(!dirs.contains(&PathBuf::from("proj/src/locked")));
    assert!(dirs.contains(&PathBuf::from("proj/src")));
    Ok(())
}

#[test]
fn missing_or_unreadable_root_is_fatal() {
    let fs = project();
    fs.add_unreadable_dir("locked");

    let missing = collect_watch_dirs(&fs, "nowhere".as_ref(), opts(true, false, None));
    assert!(matches!(missing, Err(WwatchError::WatchRoot { .. })));

    let locked = collect_watch_dirs(&fs, "locked".as_ref(), opts(true, false, None));
    assert!(matches!(locked, Err(WwatchError::WatchRoot { .. })));

    let file_root = collect_watch_dirs(&fs, "proj/main.go".as_ref(), opts(false, false, None));
    assert!(matches!(file_root, Err(WwatchError::WatchRoot { .. })));
}

#[test]
fn real_filesystem_walk_matches_layout() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path();
    std::fs::create_dir_all(root.join("a/b"))?;
    std::fs::create_dir_all(root.join(".hidden/inner"))?;
    std::fs::write(root.join("a/file.txt"), "x")?;

    let dirs = collect_watch_dirs(&RealFileSystem, root, opts(true, false, None))?;
    assert_eq!(
        dirs,
        vec![root.to_path_buf(), root.join("a"), root.join("a/b")]
    );
    Ok(())
}
