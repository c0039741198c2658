use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use serial_test::serial;
use sitedoc::core::Document;
use sitedoc::test_utils::fixtures;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LEGACY_ID: &str = "legacy1";

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new(config: &str) -> Self {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.toml"), config).unwrap();
        fs::create_dir_all(temp.path().join("store")).unwrap();
        Self {
            temp,
        }
    }

    fn hosted() -> Self {
        Self::new("environment = \"hosted\"\norg_key = \"cityofx\"\n")
    }

    fn store(&self) -> PathBuf {
        self.temp.path().join("store")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    fn put(&self, id: &str, document: &Document) {
        let dir = self.store().join(id);
        fs::create_dir_all(dir.join("resources")).unwrap();
        fs::write(dir.join("item.json"), serde_json::to_vec_pretty(&document.item).unwrap()).unwrap();
        fs::write(dir.join("data.json"), serde_json::to_vec_pretty(&document.data).unwrap()).unwrap();
    }

    fn put_resource(&self, id: &str, name: &str) {
        fs::write(self.store().join(id).join("resources").join(name), b"png").unwrap();
    }

    fn data(&self, id: &str) -> Value {
        read_json(&self.store().join(id).join("data.json"))
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sitedoc").unwrap();
        cmd.env_remove("SITEDOC_STORE")
            .env_remove("SITEDOC_CONFIG_PATH")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(self.path("config.toml"))
            .arg("--store")
            .arg(self.store());
        cmd
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("sitedoc")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("instantiate"))
        .stdout(predicate::str::contains("prune"));
}

#[test]
fn test_upgrade_dry_run_then_write() {
    let ws = Workspace::hosted();
    ws.put(LEGACY_ID, &fixtures::legacy_site());

    ws.cmd()
        .args(["upgrade", LEGACY_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains("ensure-catalog"))
        .stdout(predicate::str::contains("--write"));
    assert!(ws.data(LEGACY_ID).get("catalog").is_none());

    ws.cmd().args(["upgrade", LEGACY_ID, "--write"]).assert().success();
    let data = ws.data(LEGACY_ID);
    assert_eq!(data["catalog"]["groups"][0], "0f1e2d3c4b5a69788796a5b4c3d2e1f0");
    assert_eq!(data["values"]["subdomain"], "parks");

    ws.cmd()
        .args(["upgrade", LEGACY_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains("already at schema version"));
}

#[test]
fn test_inspect_json() {
    let ws = Workspace::hosted();
    ws.put(fixtures::SITE_ID, &fixtures::site_with_layout());
    ws.put_resource(fixtures::SITE_ID, "hub-image-crop-old.png");

    let output = ws.cmd().args(["inspect", fixtures::SITE_ID, "--format", "json"]).assert().success();
    let report: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(report["needsUpgrade"], false);
    assert_eq!(report["dependencies"], serde_json::json!(["map1", "app1", "app2"]));
    assert_eq!(report["staleCrops"], serde_json::json!(["hub-image-crop-old.png"]));
}

#[test]
fn test_missing_document_reports_not_found() {
    let ws = Workspace::hosted();
    ws.cmd()
        .args(["inspect", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_convert_then_instantiate() {
    let ws = Workspace::hosted();
    ws.put(fixtures::SITE_ID, &fixtures::site_with_layout());
    let template_path = ws.path("parks.template.json");

    ws.cmd()
        .args(["convert", fixtures::SITE_ID, "--out"])
        .arg(&template_path)
        .assert()
        .success();
    let template = read_json(&template_path);
    assert_eq!(template["itemId"], fixtures::SITE_ID);
    assert_eq!(template["item"]["title"], "{{solution.title}}");

    ws.cmd()
        .arg("instantiate")
        .arg(&template_path)
        .args(["--title", "Trails"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trails-cityofx.hub.arcgis.com"));

    let domains = read_json(&ws.store().join("domains.json"));
    assert!(domains.get("trails-cityofx.hub.arcgis.com").is_some());

    ws.cmd()
        .arg("instantiate")
        .arg(&template_path)
        .args(["--title", "Trails"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trails-1-cityofx.hub.arcgis.com"));
}

#[test]
fn test_instantiate_with_settings_file() {
    let ws = Workspace::hosted();
    let template_path = ws.path("about.template.json");
    fs::write(&template_path, serde_json::to_vec(&fixtures::page_template()).unwrap()).unwrap();
    let settings_path = ws.path("settings.json");
    fs::write(&settings_path, r#"{"organization": {"id": "ignored"}}"#).unwrap();

    ws.cmd()
        .arg("instantiate")
        .arg(&template_path)
        .args(["--title", "About"])
        .arg("--settings")
        .arg(&settings_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created page"));
}

#[test]
fn test_prune_dry_run_and_remove() {
    let ws = Workspace::hosted();
    ws.put(fixtures::SITE_ID, &fixtures::site_with_layout());
    ws.put_resource(fixtures::SITE_ID, "hub-image-crop-c1.png");
    ws.put_resource(fixtures::SITE_ID, "hub-image-crop-old.png");
    ws.put_resource(fixtures::SITE_ID, "logo.png");
    let resources = ws.store().join(fixtures::SITE_ID).join("resources");

    ws.cmd()
        .args(["prune", fixtures::SITE_ID, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hub-image-crop-old.png"));
    assert!(resources.join("hub-image-crop-old.png").exists());

    ws.cmd().args(["prune", fixtures::SITE_ID]).assert().success();
    assert!(!resources.join("hub-image-crop-old.png").exists());
    assert!(resources.join("hub-image-crop-c1.png").exists());
    assert!(resources.join("logo.png").exists());
}

#[test]
fn test_allocate_self_managed() {
    let ws = Workspace::new("environment = \"self-managed\"\nportal_hostname = \"maps.cityofx.gov\"\n");
    ws.put(fixtures::SITE_ID, &fixtures::site_with_layout());

    ws.cmd()
        .args(["allocate", "Parks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parks-1"));
    ws.cmd()
        .args(["allocate", "Trails"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trails").and(predicate::str::contains("trails-").not()));
}

#[test]
#[serial]
fn test_store_from_environment() {
    let ws = Workspace::hosted();
    ws.put(fixtures::SITE_ID, &fixtures::site_with_layout());

    Command::cargo_bin("sitedoc")
        .unwrap()
        .env("SITEDOC_STORE", ws.store())
        .env("SITEDOC_CONFIG_PATH", ws.path("config.toml"))
        .env("NO_COLOR", "1")
        .args(["inspect", fixtures::SITE_ID])
        .assert()
        .success()
        .stdout(predicate::str::contains("Parks"));
}
