//! Built-in units run against a synthetic input root.

mod common;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::TempDir;

use mac_triage::config::CollectionOptions;
use mac_triage::models::RunContext;
use mac_triage::units::registry::UnitRegistry;

fn run_builtin(name: &str, options: CollectionOptions) -> Result<std::sync::Arc<RunContext>> {
    let ctx = common::context(options, common::RUN_ID);
    let registry = UnitRegistry::with_builtin_units()?;
    let descriptor = registry.get(name).expect("built-in unit");
    descriptor.instantiate(ctx.clone()).run()?;
    Ok(ctx)
}

/// Rows of a CSV output keyed by header
fn read_rows(path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[test]
fn test_bash_history_per_user() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let alice = input.path().join("Users/alice");
    fs::create_dir_all(alice.join(".bash_sessions"))?;
    fs::write(alice.join(".bash_history"), "ls -la\ncd /tmp\n")?;
    fs::write(alice.join(".bash_sessions/S1.history"), "whoami\n")?;
    fs::create_dir_all(input.path().join("var/root"))?;
    fs::write(input.path().join("var/root/.zsh_history"), "id\n")?;

    let ctx = run_builtin("bash", common::options(input.path(), output.path()))?;
    let rows = read_rows(&common::output_path(&ctx, "bash", "csv"))?;

    let summary: Vec<(&str, &str, &str, &str)> = rows
        .iter()
        .map(|r| (r["user"].as_str(), r["src_file"].as_str(), r["item_index"].as_str(), r["cmd"].as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("alice", ".bash_history", "1", "ls -la"),
            ("alice", ".bash_history", "2", "cd /tmp"),
            ("alice", "S1.history", "1", "whoami"),
            ("root", ".zsh_history", "1", "id"),
        ]
    );
    assert!(rows.iter().all(|r| !r["mtime"].is_empty()));
    Ok(())
}

#[test]
fn test_dirlist_exclusions_bundles_and_hashes() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let root = input.path();
    fs::write(root.join("a.txt"), "abc")?;
    fs::create_dir_all(root.join("sub"))?;
    fs::write(root.join("sub/empty.txt"), "")?;
    fs::create_dir_all(root.join(".fseventsd"))?;
    fs::write(root.join(".fseventsd/0001"), "events")?;
    fs::create_dir_all(root.join("Tool.app/Contents"))?;
    fs::write(root.join("Tool.app/Contents/Info.plist"), "<plist/>")?;

    let mut options = common::options(root, output.path());
    options.dirlist.workers = 3;
    let ctx = run_builtin("dirlist", options)?;
    let rows = read_rows(&common::output_path(&ctx, "dirlist", "csv"))?;

    let root_text = root.to_string_lossy().into_owned();
    let listed: HashMap<String, &HashMap<String, String>> = rows
        .iter()
        .map(|r| (format!("{}{}", r["path"], r["name"]), r))
        .collect();

    let a = listed[&format!("{}/a.txt", root_text)];
    assert_eq!(a["mode"], "Regular File");
    assert_eq!(a["size"], "3");
    assert_eq!(a["sha256"], "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");

    let empty = listed[&format!("{}/sub/empty.txt", root_text)];
    assert_eq!(empty["sha256"], "");

    assert_eq!(listed[&format!("{}/Tool.app", root_text)]["mode"], "Directory");
    assert!(!listed.contains_key(&format!("{}/Tool.app/Contents", root_text)));
    assert!(!listed.keys().any(|k| k.contains(".fseventsd")));
    assert_eq!(rows.len(), 5, "root, a.txt, sub, sub/empty.txt, Tool.app");
    Ok(())
}

#[test]
fn test_dirlist_single_thread_matches_pool() -> Result<()> {
    let input = TempDir::new()?;
    let root = input.path();
    for i in 0..20 {
        fs::write(root.join(format!("file{}.log", i)), format!("line {}", i))?;
    }

    let mut counts = Vec::new();
    for multithreading in [true, false] {
        let output = TempDir::new()?;
        let mut options = common::options(root, output.path());
        options.dirlist.multithreading = multithreading;
        let ctx = run_builtin("dirlist", options)?;
        counts.push(read_rows(&common::output_path(&ctx, "dirlist", "csv"))?.len());
    }

    assert_eq!(counts, vec![21, 21]);
    Ok(())
}

#[test]
fn test_systeminfo_from_image() -> Result<()> {
    let input = TempDir::new()?;
    let output = TempDir::new()?;
    let root = input.path();

    let prefs_dir = root.join("Library/Preferences/SystemConfiguration");
    fs::create_dir_all(&prefs_dir)?;
    fs::write(
        prefs_dir.join("preferences.plist"),
        r#"<plist version="1.0"><dict>
            <key>LocalHostName</key><string>Analyst-MBP</string>
            <key>ComputerName</key><string>Analyst&apos;s MacBook</string>
            <key>HostName</key><string>analyst.example.com</string>
            <key>Model</key><string>MacBookPro18,3</string>
        </dict></plist>"#,
    )?;
    fs::write(
        root.join("Library/Preferences/.GlobalPreferences.plist"),
        r#"<plist version="1.0"><dict>
            <key>com.apple.TimeZonePref.Last_Selected_City</key>
            <array>
                <real>37.33</real>
                <real>-122.03</real>
                <integer>0</integer>
                <string>America/Los_Angeles</string>
                <string>US</string>
            </array>
        </dict></plist>"#,
    )?;
    let version_dir = root.join("System/Library/CoreServices");
    fs::create_dir_all(&version_dir)?;
    fs::write(
        version_dir.join("SystemVersion.plist"),
        r#"<plist version="1.0"><dict>
            <key>ProductBuildVersion</key><string>23C71</string>
            <key>ProductVersion</key><string>14.2</string>
        </dict></plist>"#,
    )?;

    let ctx = run_builtin("systeminfo", common::options(root, output.path()))?;
    let rows = read_rows(&common::output_path(&ctx, "systeminfo", "csv"))?;

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["local_hostname"], "Analyst-MBP");
    assert_eq!(row["computer_name"], "Analyst's MacBook");
    assert_eq!(row["model"], "MacBookPro18,3");
    assert_eq!(row["product_version"], "14.2");
    assert_eq!(row["product_build_version"], "23C71");
    assert_eq!(row["serial_no"], "C02TEST");
    assert_eq!(row["system_tz"], "America/Los_Angeles");
    assert_eq!(row["ipaddress"], "192.168.1.20");
    assert_eq!(row["fvde_status"], "NA");
    assert_eq!(row["collection_start"], ctx.identity.timestamp());
    Ok(())
}
