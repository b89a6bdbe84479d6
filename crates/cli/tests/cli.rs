use assert_cmd::Command;

fn bookshelf() -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    cmd.env("BOOKSHELF_CONFIG_DIR", std::env::temp_dir())
        .env_remove("BOOKSHELF_DATABASE__URL")
        .env_remove("BOOKSHELF_ENV");
    cmd
}

#[test]
fn help_lists_commands() {
    let output = bookshelf().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("migrate"));
    assert!(stdout.contains("check-db"));
}

#[test]
fn check_db_succeeds_against_memory_database() {
    bookshelf()
        .args(["check-db", "--database-url", "sqlite::memory:"])
        .assert()
        .success();
}

#[test]
fn migrate_reports_applied_count() {
    let output = bookshelf()
        .args(["migrate", "--database-url", "sqlite::memory:"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("applied 1 migration(s)"));
}

#[test]
fn unknown_environment_fails() {
    bookshelf()
        .env("BOOKSHELF_ENV", "qa")
        .args(["check-db", "--database-url", "sqlite::memory:"])
        .assert()
        .failure();
}
