use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tomcat-manager"))
        .args(args)
        .env("HOME", home)
        .env_remove("CATALINA_HOME")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run tomcat-manager")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("Failed to parse stdout JSON")
}

fn prepare_workspace(home: &Path) {
    let repo = home.join("Developer").join("shop");
    std::fs::create_dir_all(&repo).unwrap();
    std::fs::write(
        repo.join("pom.xml"),
        "<project><artifactId>shop</artifactId><version>2.0</version>\
         <packaging>war</packaging><build><finalName>shop</finalName></build></project>",
    )
    .unwrap();

    let webapps = home.join("tomcat").join("webapps");
    std::fs::create_dir_all(webapps.join("ROOT")).unwrap();
    std::fs::write(webapps.join("shop.war"), b"war").unwrap();
    std::fs::write(webapps.join("legacy.war"), b"war").unwrap();
}

#[test]
fn first_launch_writes_default_preferences() {
    let home = TempDir::new().unwrap();
    let prefs = stdout_json(&run_cli(home.path(), &["config", "show"]));

    assert!(prefs["last_launch"].is_string());
    assert_eq!(prefs["launch_on_login"], true);
    assert_eq!(
        prefs["repository_root"],
        home.path().join("Developer").to_string_lossy().as_ref()
    );
    assert!(home.path().join(".tomcat-manager/config.json").exists());
}

#[test]
fn config_set_persists_and_rejects_unknown_keys() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["config", "set", "shutdown_grace_secs", "9"]);
    assert!(output.status.success());

    let prefs = stdout_json(&run_cli(home.path(), &["config", "show"]));
    assert_eq!(prefs["shutdown_grace_secs"], 9);

    let output = run_cli(home.path(), &["config", "set", "colour", "blue"]);
    assert!(!output.status.success());
}

#[test]
fn apps_lists_merged_applications() {
    let home = TempDir::new().unwrap();
    prepare_workspace(home.path());
    let catalina = home.path().join("tomcat");
    let output = run_cli(
        home.path(),
        &["config", "set", "catalina_home", catalina.to_string_lossy().as_ref()],
    );
    assert!(output.status.success());

    let apps = stdout_json(&run_cli(home.path(), &["apps", "--json"]));
    let apps = apps.as_array().expect("apps should be an array");
    let names: Vec<&str> = apps.iter().filter_map(|app| app["name"].as_str()).collect();
    assert_eq!(names, vec!["legacy", "shop"]);

    let shop = &apps[1];
    assert_eq!(shop["can_build"], true);
    assert_eq!(shop["is_deployed"], true);
    assert_eq!(shop["version"], "2.0");
    assert_eq!(apps[0]["can_build"], false);
}

#[test]
fn build_of_deploy_only_app_is_a_no_op() {
    let home = TempDir::new().unwrap();
    prepare_workspace(home.path());
    let catalina = home.path().join("tomcat");
    run_cli(
        home.path(),
        &["config", "set", "catalina_home", catalina.to_string_lossy().as_ref()],
    );

    let output = run_cli(home.path(), &["build", "legacy"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("nothing to build"));
}

#[test]
fn unknown_app_fails() {
    let home = TempDir::new().unwrap();
    let output = run_cli(home.path(), &["remove", "ghost"]);
    assert!(!output.status.success());
}
