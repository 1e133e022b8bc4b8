// tests/config_resolution.rs

mod common;

use common::{demo_path, init_tracing};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use wwatch::cli::CliArgs;
use wwatch::config::resolve::{ext_pattern, resolve_path};
use wwatch::config::{
    load_and_validate, load_from_cli, parse_config_str, parse_duration, ConfigFile,
    DEFAULT_TASK_NAME,
};
use wwatch::errors::WwatchError;

type TestResult = Result<(), Box<dyn Error>>;

fn resolve(toml: &str) -> Result<ConfigFile, WwatchError> {
    ConfigFile::try_from(parse_config_str(toml, None)?)
}

fn demos_dir() -> PathBuf {
    let dir = demo_path("");
    dir.canonicalize().unwrap_or(dir)
}

#[test]
fn single_section_config_yields_default_task() -> TestResult {
    init_tracing();

    let cfg = load_and_validate(demo_path("single.toml"))?;
    let base = demos_dir();

    assert_eq!(cfg.tasks().len(), 1);
    let task = &cfg.tasks()[0];
    assert_eq!(task.name, DEFAULT_TASK_NAME);
    assert_eq!(task.root, base.join("src"));
    assert_eq!(task.cwd, base);
    assert_eq!(task.match_pattern.as_str(), r".*\.(go)$");
    assert_eq!(task.delay, Duration::from_millis(100));
    assert_eq!(task.command.program, "go");
    assert_eq!(task.command.args, vec!["run", "./src"]);

    // A single task owns its on-start command.
    let on_start = task.on_start.as_ref().ok_or("on-start missing")?;
    assert_eq!(on_start.to_string(), "go generate ./...");
    assert!(cfg.on_start().is_none());
    Ok(())
}

#[test]
fn run_sections_inherit_from_main_section() -> TestResult {
    init_tracing();

    let cfg = load_and_validate(demo_path("multi-task.toml"))?;
    let base = demos_dir();

    let names: Vec<&str> = cfg.tasks().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["assets", "server"]);

    let global = cfg.on_start().ok_or("global on-start missing")?;
    assert_eq!(global.to_string(), "make deps");
    assert_eq!(cfg.cwd(), base.as_path());

    let server = cfg.task("server").ok_or("server task missing")?;
    assert_eq!(server.root, base.join("server"));
    assert_eq!(server.cwd, base);
    assert_eq!(server.match_pattern.as_str(), r".*\.(rs|toml)$");
    assert_eq!(
        server.ignore_pattern.as_ref().map(|r| r.as_str()),
        Some("node_modules|target")
    );
    assert!(server.recursive);
    assert!(!server.dotfiles);
    assert!(!server.after);
    assert_eq!(server.delay, Duration::from_millis(250));
    assert_eq!(server.command.program, "cargo");
    assert_eq!(server.command.args, vec!["run", "--bin", "server"]);
    assert_eq!(server.pid_file.as_deref(), Some(base.join("server/server.pid").as_path()));
    assert!(server.on_start.is_none(), "onstart is never inherited");

    let assets = cfg.task("assets").ok_or("assets task missing")?;
    assert_eq!(assets.match_pattern.as_str(), r".*\.(less|js)$");
    assert!(assets.after);
    assert!(assets.dotfiles);
    assert!(assets.recursive);
    assert!(assets.pid_file.is_none());
    assert_eq!(assets.command.args, vec!["run", "build"]);
    Ok(())
}

#[test]
fn defaults_apply_when_keys_are_missing() -> TestResult {
    let cfg = resolve(r#"cmd = "make run""#)?;
    let task = &cfg.tasks()[0];

    assert_eq!(task.root, PathBuf::from("."));
    assert_eq!(task.cwd, PathBuf::from("."));
    assert_eq!(task.match_pattern.as_str(), ".*");
    assert!(task.ignore_pattern.is_none());
    assert_eq!(task.delay, Duration::from_millis(100));
    assert!(!task.recursive && !task.dotfiles && !task.after);
    Ok(())
}

#[test]
fn ext_beats_match_within_a_section() -> TestResult {
    let cfg = resolve(
        r#"
cmd = "make"
match = ".*\\.txt$"
ext = "go"
"#,
    )?;
    assert_eq!(cfg.tasks()[0].match_pattern.as_str(), r".*\.(go)$");
    Ok(())
}

#[test]
fn own_match_beats_inherited_ext() -> TestResult {
    let cfg = resolve(
        r#"
ext = "go"

[run.web]
cmd = "make web"
match = ".*\\.html$"

[run.api]
cmd = "make api"
"#,
    )?;

    let web = cfg.task("web").ok_or("web missing")?;
    assert_eq!(web.match_pattern.as_str(), r".*\.html$");
    let api = cfg.task("api").ok_or("api missing")?;
    assert_eq!(api.match_pattern.as_str(), r".*\.(go)$");
    Ok(())
}

#[test]
fn relative_paths_resolve_against_config_dir() {
    let base = Path::new("/srv/project");
    assert_eq!(resolve_path(Some(base), "./src"), PathBuf::from("/srv/project/src"));
    assert_eq!(resolve_path(Some(base), "."), PathBuf::from("/srv/project"));
    assert_eq!(resolve_path(Some(base), "/abs/dir"), PathBuf::from("/abs/dir"));
    assert_eq!(resolve_path(None, "./src"), PathBuf::from("src"));
    assert_eq!(resolve_path(None, "."), PathBuf::from("."));
}

#[test]
fn ext_pattern_escapes_and_strips_dots() {
    assert_eq!(ext_pattern("less, .js").as_deref(), Some(r".*\.(less|js)$"));
    assert_eq!(ext_pattern("c++").as_deref(), Some(r".*\.(c\+\+)$"));
    assert_eq!(ext_pattern(" , "), None);
}

#[test]
fn config_without_any_task_is_rejected() {
    let err = resolve(r#"dir = "src""#).unwrap_err();
    assert!(matches!(err, WwatchError::ConfigError(ref m) if m.contains("no task found")));
}

#[test]
fn main_cmd_and_run_sections_are_exclusive() {
    let err = resolve(
        r#"
cmd = "make"

[run.other]
cmd = "make other"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, WwatchError::ConfigError(_)));
}

#[test]
fn run_section_without_cmd_is_rejected() {
    let err = resolve(
        r#"
[run.broken]
dir = "src"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, WwatchError::ConfigError(ref m) if m.contains("broken")));
}

#[test]
fn invalid_patterns_and_delays_are_rejected() {
    let bad_match = resolve("cmd = \"make\"\nmatch = \"(unclosed\"").unwrap_err();
    assert!(matches!(bad_match, WwatchError::ConfigError(ref m) if m.contains("match")));

    let bad_ignore = resolve("cmd = \"make\"\nignore = \"[z-a]\"").unwrap_err();
    assert!(matches!(bad_ignore, WwatchError::ConfigError(ref m) if m.contains("ignore")));

    let bad_delay = resolve("cmd = \"make\"\ndelay = \"10\"").unwrap_err();
    assert!(matches!(bad_delay, WwatchError::ConfigError(ref m) if m.contains("delay")));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let err = parse_config_str("cmd = ", None).unwrap_err();
    assert!(matches!(err, WwatchError::TomlError(_)));
}

#[test]
fn durations_parse_like_go() {
    assert_eq!(parse_duration("100ms"), Ok(Duration::from_millis(100)));
    assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
    assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
    assert_eq!(parse_duration("250us"), Ok(Duration::from_micros(250)));
    assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
    assert_eq!(parse_duration("0"), Ok(Duration::ZERO));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("5").is_err());
    assert!(parse_duration("3d").is_err());
    assert!(parse_duration("ms").is_err());
}

#[test]
fn cli_requires_cmd_or_config() {
    let err = load_from_cli(&CliArgs::default()).unwrap_err();
    assert!(matches!(err, WwatchError::ConfigError(ref m) if m.contains("--cmd")));
}

#[test]
fn cli_flags_describe_a_single_task() -> TestResult {
    let args = CliArgs {
        dir: Some("./src".to_string()),
        ext: Some("go".to_string()),
        cmd: Some("go run .".to_string()),
        delay: Some("1s".to_string()),
        recursive: true,
        after: true,
        ..CliArgs::default()
    };

    let cfg = load_from_cli(&args)?;
    let task = &cfg.tasks()[0];
    assert_eq!(task.name, DEFAULT_TASK_NAME);
    assert_eq!(task.root, PathBuf::from("src"));
    assert_eq!(task.match_pattern.as_str(), r".*\.(go)$");
    assert_eq!(task.delay, Duration::from_secs(1));
    assert!(task.recursive);
    assert!(task.after);
    assert!(!task.dotfiles);
    Ok(())
}

#[test]
fn cli_config_flag_takes_precedence() -> TestResult {
    let args = CliArgs {
        config: Some(demo_path("multi-task.toml").to_string_lossy().into_owned()),
        cmd: Some("ignored".to_string()),
        ..CliArgs::default()
    };

    let cfg = load_from_cli(&args)?;
    assert_eq!(cfg.tasks().len(), 2);
    Ok(())
}
