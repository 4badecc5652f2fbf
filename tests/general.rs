use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::predicate;
use std::fs;
use tempfile::tempdir;

fn get_cmd() -> Command {
    Command::cargo_bin("patchgen").expect("Failed to find binary")
}

fn write_mod(root: &std::path::Path, name: &str, relative: &str, content: &str) -> std::path::PathBuf {
    let mod_dir = root.join(name);
    let file_path = mod_dir.join(relative);
    fs::create_dir_all(file_path.parent().unwrap()).unwrap();
    fs::write(&file_path, content).unwrap();
    mod_dir
}

#[test]
fn s1_accumulating_on_actions_end_to_end() {
    let dir = tempdir().unwrap();
    let base = write_mod(
        dir.path(),
        "base",
        "common/on_action/00_hooks.txt",
        "on_game_start = {\n\ton_actions = {\n\t\tvanilla_init\n\t}\n}\n",
    );
    let mod_a = write_mod(
        dir.path(),
        "mod_a",
        "common/on_action/00_hooks.txt",
        "on_game_start = {\n\ton_actions = {\n\t\tvanilla_init\n\t\tmodA_init\n\t}\n}\n",
    );
    let mod_b = write_mod(
        dir.path(),
        "mod_b",
        "common/on_action/00_hooks.txt",
        "on_game_start = {\n\ton_actions = {\n\t\tvanilla_init\n\t\tmodB_init\n\t}\n}\n",
    );
    let output = dir.path().join("out");

    get_cmd()
        .arg("--mods").arg(&base)
        .arg("--mods").arg(&mod_a)
        .arg("--mods").arg(&mod_b)
        .arg("--output").arg(&output)
        .arg("--name").arg("S1 Patch")
        .output()
        .unwrap()
        .assert()
        .success();

    let merged = fs::read_to_string(output.join("common/on_action/00_hooks.txt")).unwrap();
    assert!(merged.contains("vanilla_init"));
    assert!(merged.contains("modA_init"));
    assert!(merged.contains("modB_init"));
    assert!(merged.find("modA_init").unwrap() < merged.find("modB_init").unwrap());
}

#[test]
fn s2_atomic_event_replacement_end_to_end() {
    let dir = tempdir().unwrap();
    let base = write_mod(
        dir.path(),
        "base",
        "events/test.txt",
        "europe.0001 = {\n\ttype = character_event\n\ttitle = base_title\n\toption = { name = a }\n}\n",
    );
    let mod_a = write_mod(
        dir.path(),
        "mod_a",
        "events/test.txt",
        "europe.0001 = {\n\ttype = character_event\n\ttitle = modA_title\n\toption = { name = a }\n}\n",
    );
    let mod_b = write_mod(
        dir.path(),
        "mod_b",
        "events/test.txt",
        "europe.0001 = {\n\ttype = character_event\n\ttitle = base_title\n\toption = { name = b }\n}\n",
    );
    let output = dir.path().join("out");

    get_cmd()
        .arg("--mods").arg(&base)
        .arg("--mods").arg(&mod_a)
        .arg("--mods").arg(&mod_b)
        .arg("--output").arg(&output)
        .arg("--name").arg("S2 Patch")
        .output()
        .unwrap()
        .assert()
        .success();

    let merged = fs::read_to_string(output.join("events/test.txt")).unwrap();
    assert!(merged.contains("name = b"));
    assert!(!merged.contains("modA_title"));
    assert!(merged.contains("base_title"));
}

#[test]
fn s6_byte_identical_mod_is_not_written_to_the_patch() {
    let dir = tempdir().unwrap();
    let text = "europe.0001 = {\n\ttype = character_event\n}\n";
    let base = write_mod(dir.path(), "base", "events/test.txt", text);
    let mod_a = write_mod(dir.path(), "mod_a", "events/test.txt", text);
    let output = dir.path().join("out");

    get_cmd()
        .arg("--mods").arg(&base)
        .arg("--mods").arg(&mod_a)
        .arg("--output").arg(&output)
        .arg("--name").arg("S6 Patch")
        .arg("--verbose")
        .output()
        .unwrap()
        .assert()
        .success();

    assert!(!output.join("events/test.txt").exists());
}

#[test]
fn list_mods_prints_base_and_submods() {
    let dir = tempdir().unwrap();
    let base = write_mod(dir.path(), "base", "common/x.txt", "a = 1\n");
    let mod_a = write_mod(dir.path(), "mod_a", "common/x.txt", "a = 2\n");

    get_cmd()
        .arg("--mods").arg(&base)
        .arg("--mods").arg(&mod_a)
        .arg("--list-mods")
        .output()
        .unwrap()
        .assert()
        .success()
        .stdout(predicate::str::contains("base:"))
        .stdout(predicate::str::contains("mod_a"));
}

#[test]
fn auto_detect_is_rejected_explicitly() {
    let dir = tempdir().unwrap();
    let base = write_mod(dir.path(), "base", "common/x.txt", "a = 1\n");

    get_cmd()
        .arg("--auto-detect")
        .arg("--mods").arg(&base)
        .output()
        .unwrap()
        .assert()
        .failure()
        .code(1);
}

#[test]
fn base_strategy_writes_nothing_for_changed_files() {
    let dir = tempdir().unwrap();
    let base = write_mod(dir.path(), "base", "common/x.txt", "a = 1\n");
    let mod_a = write_mod(dir.path(), "mod_a", "common/x.txt", "a = 2\n");
    let output = dir.path().join("out");

    get_cmd()
        .arg("--mods").arg(&base)
        .arg("--mods").arg(&mod_a)
        .arg("--output").arg(&output)
        .arg("--name").arg("Base Patch")
        .arg("--strategy").arg("base")
        .output()
        .unwrap()
        .assert()
        .success();

    assert!(!output.join("common/x.txt").exists());
}
