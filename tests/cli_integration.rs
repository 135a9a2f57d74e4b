//! CLI integration tests for repoman
//!
//! Every test builds a fake filesystem root (sources.list, sources.list.d,
//! os-release) in a temporary directory and points the binary at it with
//! `--root`, so nothing under the real /etc is touched.

use predicates::prelude::*;
use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAIN_LIST: &str = "\
# Main archive
deb http://archive.test/ubuntu focal main restricted
# deb http://old.test/ubuntu focal universe
";

const SOURCES: &str = "\
Types: deb
URIs: http://deb.test/debian
Suites: bookworm bookworm-updates
Components: main
";

/// Get a command instance for the repoman binary
fn repoman_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("repoman"))
}

struct FakeRoot {
    dir: TempDir,
}

impl FakeRoot {
    fn new(os_release: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("etc/apt/sources.list.d")).unwrap();
        fs::write(dir.path().join("etc/apt/sources.list"), MAIN_LIST).unwrap();
        fs::write(dir.path().join("etc/os-release"), os_release).unwrap();
        Self { dir }
    }

    fn jammy() -> Self {
        Self::new("ID=ubuntu\nVERSION_ID=\"22.04\"\n")
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn main_list(&self) -> PathBuf {
        self.path().join("etc/apt/sources.list")
    }

    fn part(&self, name: &str) -> PathBuf {
        self.path().join("etc/apt/sources.list.d").join(name)
    }

    fn backups(&self) -> PathBuf {
        self.path().join("backups")
    }

    fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    /// Command with the root, an absent config file and a backup dir set
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = repoman_cmd();
        cmd.env_remove("REPOMAN_ROOT")
            .env_remove("REPOMAN_CONFIG")
            .arg("--root")
            .arg(self.path())
            .arg("--config")
            .arg(self.path().join("no-config.toml"))
            .arg("--backup-dir")
            .arg(self.backups());
        cmd
    }

    fn list_json(&self) -> Vec<serde_json::Value> {
        let out = self.cmd().args(["--format", "json", "list"]).output().unwrap();
        assert!(out.status.success());
        serde_json::from_slice(&out.stdout).unwrap()
    }
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn test_list_shows_entries() {
    let root = FakeRoot::jammy();

    root.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("deb http://archive.test/ubuntu focal main restricted"))
        .stdout(predicate::str::contains("# deb http://old.test/ubuntu focal universe"))
        .stdout(predicate::str::contains("2 of 2 entries"));
}

#[test]
fn test_list_json_includes_ids_and_state() {
    let root = FakeRoot::jammy();
    fs::write(root.part("debian.sources"), SOURCES).unwrap();

    let items = root.list_json();
    assert_eq!(items.len(), 4);

    let by_id = |id: u64| items.iter().find(|i| i["id"] == id).unwrap();
    assert_eq!(by_id(1)["enabled"], true);
    assert_eq!(by_id(1)["format"], "one_line");
    assert_eq!(by_id(2)["enabled"], false);
    assert_eq!(by_id(3)["format"], "stanza");
    assert_eq!(by_id(3)["index"], 0);
    assert_eq!(by_id(4)["suite"], "bookworm-updates");
}

#[test]
fn test_list_filter() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["list", "--filter", "OLD.TEST"])
        .assert()
        .success()
        .stdout(predicate::str::contains("old.test"))
        .stdout(predicate::str::contains("archive.test").not())
        .stdout(predicate::str::contains("1 of 2 entries"));
}

#[test]
fn test_sources_ignored_on_older_release() {
    let root = FakeRoot::new("ID=debian\nVERSION_ID=\"11\"\n");
    fs::write(root.part("debian.sources"), SOURCES).unwrap();

    assert_eq!(root.list_json().len(), 2);

    let items = {
        let out = root
            .cmd()
            .args(["--os-id", "debian", "--os-version", "12", "--format", "json", "list"])
            .output()
            .unwrap();
        serde_json::from_slice::<Vec<serde_json::Value>>(&out.stdout).unwrap()
    };
    assert_eq!(items.len(), 4);
}

#[test]
fn test_show_unknown_id_fails() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["show", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No repository #9"));

    root.cmd().args(["show", "0"]).assert().failure();
}

#[test]
fn test_os_reports_formats() {
    let root = FakeRoot::jammy();

    root.cmd()
        .arg("os")
        .assert()
        .success()
        .stdout(predicate::str::contains("ubuntu 22.04"))
        .stdout(predicate::str::contains(".sources"));
}

// =============================================================================
// Mutations
// =============================================================================

#[test]
fn test_toggle_enables_disabled_line() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["toggle", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repository enabled."));

    let content = root.read(&root.main_list());
    assert!(content.contains("\ndeb http://old.test/ubuntu focal universe\n"));
    assert!(content.starts_with("# Main archive\n"));

    // Backup of the original content
    let backups: Vec<_> = fs::read_dir(root.backups()).unwrap().flatten().collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(backups[0].path()).unwrap(), MAIN_LIST);

    // No temp file left behind
    assert!(!root.path().join("etc/apt/sources.list.repoman-tmp").exists());
}

#[test]
fn test_toggle_stanza_inserts_enabled_field() {
    let root = FakeRoot::jammy();
    fs::write(root.part("debian.sources"), SOURCES).unwrap();

    root.cmd()
        .args(["toggle", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repository disabled."));

    let content = root.read(&root.part("debian.sources"));
    assert_eq!(content.lines().nth(1), Some("Enabled: no"));

    let items = root.list_json();
    assert!(items.iter().filter(|i| i["format"] == "stanza").all(|i| i["enabled"] == false));
    assert!(items.iter().filter(|i| i["format"] == "one_line").any(|i| i["enabled"] == true));
}

#[test]
fn test_delete_removes_line() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["--no-backup", "delete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted."));

    assert_eq!(
        root.read(&root.main_list()),
        "# Main archive\n# deb http://old.test/ubuntu focal universe\n"
    );
    assert!(!root.backups().exists());
}

#[test]
fn test_add_appends_to_main_list() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["add", "deb http://new.test/ubuntu focal main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repository added to"));

    assert!(root
        .read(&root.main_list())
        .ends_with("# deb http://old.test/ubuntu focal universe\ndeb http://new.test/ubuntu focal main\n"));
}

#[test]
fn test_add_creates_part_file() {
    let root = FakeRoot::jammy();
    let target = root.part("extra.list");

    root.cmd()
        .args(["add", "deb http://extra.test stable main", "--file"])
        .arg(&target)
        .assert()
        .success();

    assert_eq!(root.read(&target), "deb http://extra.test stable main\n");
    assert_eq!(root.list_json().len(), 3);
}

#[test]
fn test_add_rejects_non_declaration() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["add", "rm -rf /"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid repository line"));

    assert_eq!(root.read(&root.main_list()), MAIN_LIST);
}

#[test]
fn test_read_only_refuses_changes() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["--read-only", "toggle", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Read-only mode."));

    assert_eq!(root.read(&root.main_list()), MAIN_LIST);
}

#[test]
fn test_backup_command() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["backup", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created:"));

    let names: Vec<String> = fs::read_dir(root.backups())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].contains("sources.list."));
    assert!(names[0].ends_with(".bak"));
}

// =============================================================================
// Export / Import
// =============================================================================

#[test]
fn test_export_then_import_into_fresh_root() {
    let source = FakeRoot::jammy();
    fs::write(source.part("debian.sources"), SOURCES).unwrap();
    let export = source.path().join("repos.txt");

    source
        .cmd()
        .arg("export")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 4 repo(s)"));

    let exported = source.read(&export);
    assert!(exported.starts_with("# APT Repository Export"));
    assert!(exported.contains("deb http://deb.test/debian bookworm-updates main  # from: "));

    // A root that already has the main list only gains the deb822 entries
    let target = FakeRoot::jammy();
    target
        .cmd()
        .arg("import")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 repo(s) imported."));

    let content = target.read(&target.main_list());
    assert!(content.ends_with(
        "deb http://deb.test/debian bookworm main\ndeb http://deb.test/debian bookworm-updates main\n"
    ));

    // Importing again finds nothing new
    target
        .cmd()
        .arg("import")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("No new repos found to import."));
}

// =============================================================================
// Session mode
// =============================================================================

#[test]
fn test_exec_toggle_then_undo() {
    let root = FakeRoot::jammy();

    root.cmd()
        .args(["exec", "-"])
        .write_stdin("toggle 1\n# comment\n\ntoggle 2\nundo\nundo\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Repository disabled."))
        .stdout(predicate::str::contains("Undo applied."));

    assert_eq!(root.read(&root.main_list()), MAIN_LIST);
}

#[test]
fn test_exec_reports_failures() {
    let root = FakeRoot::jammy();

    root.cmd()
        .arg("exec")
        .write_stdin("undo\ntoggle 1\nbogus\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1: Nothing to undo."))
        .stderr(predicate::str::contains("line 3: unknown command: bogus"))
        .stderr(predicate::str::contains("2 command(s) failed"));

    // The valid command in between still ran
    assert!(root.read(&root.main_list()).contains("# deb http://archive.test/ubuntu focal main restricted"));
}

#[test]
fn test_exec_add_and_list() {
    let root = FakeRoot::jammy();
    let target = root.part("x.list");
    let script = format!("add {} deb http://x.test sid main\nlist\n", target.display());

    root.cmd()
        .arg("exec")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(predicate::str::contains("deb http://x.test sid main"))
        .stdout(predicate::str::contains("3 of 3 entries"));
}

// =============================================================================
// Probe
// =============================================================================

#[test]
fn test_probe_local_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let root = FakeRoot::jammy();
    fs::write(
        root.main_list(),
        format!("deb http://127.0.0.1:{}/debian stable main\n", port),
    )
    .unwrap();

    let out = root
        .cmd()
        .args(["--format", "json", "probe", "1", "--timeout-ms", "2000"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["metadata"]["reachable"], true);
    assert_eq!(report["metadata"]["cache"], "unavailable");
    assert_eq!(report["target"]["suite"], "stable");
}

#[test]
fn test_probe_reads_release_cache() {
    let root = FakeRoot::jammy();
    let lists = root.path().join("var/lib/apt/lists");
    fs::create_dir_all(&lists).unwrap();
    fs::write(
        lists.join("archive.test_ubuntu_dists_focal_Release"),
        "Origin: Ubuntu\nCodename: focal\nVersion: 20.04\n",
    )
    .unwrap();

    root.cmd()
        .args(["probe", "1", "--timeout-ms", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ubuntu"))
        .stdout(predicate::str::contains("20.04"));
}
