use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const TRAIN_CONFIG: &str = "\
model:
  pretrained: yolov8n.pt
  epochs: 1
  imgsz: 320
data:
  data_config_file: data.yaml
train:
  output_dir: models
";

fn bsort(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bsort").unwrap();
    cmd.current_dir(dir).env("NO_COLOR", "1").args(["--backend", "mock", "--tracker", "none"]);
    cmd
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn infer_workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("models/best.pt"), "weights");
    write(&temp.path().join("settings.yaml"), "infer:\n  model_weights: models/best.pt\n  confidence_threshold: 0.4\n");
    temp
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("bsort").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("infer"));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let temp = TempDir::new().unwrap();
    bsort(temp.path()).arg("evaluate").assert().code(2);
}

#[test]
fn test_train_moves_checkpoint_into_models() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("settings.yaml"), TRAIN_CONFIG);

    bsort(temp.path())
        .args(["train", "--config", "settings.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Training complete"));

    assert!(temp.path().join("models/best.pt").is_file());
    assert!(temp.path().join("models/best.onnx").is_file());
    assert!(temp.path().join("models/training_manifest.json").is_file());
    assert!(!temp.path().join("runs/train/weights/best.pt").exists());
}

#[test]
fn test_train_uses_default_config_path() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("configs/settings.yaml"), TRAIN_CONFIG);

    bsort(temp.path()).arg("train").assert().success();
    assert!(temp.path().join("models/best.pt").is_file());
}

#[test]
fn test_train_twice_reports_overwrite() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("settings.yaml"), TRAIN_CONFIG);

    bsort(temp.path()).args(["train", "-c", "settings.yaml"]).assert().success();
    bsort(temp.path())
        .args(["train", "-c", "settings.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overwrote existing"));
}

#[test]
fn test_train_export_failure_still_succeeds() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("settings.yaml"), &format!("{TRAIN_CONFIG}  export_format: engine\n"));

    bsort(temp.path())
        .args(["train", "--config", "settings.yaml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("ExportFailed"))
        .stdout(predicate::str::contains("Completed with 1 warning(s)"));

    assert!(temp.path().join("models/best.pt").is_file());
    assert!(!temp.path().join("models/best.engine").exists());
}

#[test]
fn test_train_missing_data_key() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("settings.yaml"), "model:\n  pretrained: yolov8n.pt\n");

    bsort(temp.path())
        .args(["train", "--config", "settings.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MissingConfigKey"))
        .stderr(predicate::str::contains("data.data_config_file"));
    assert!(!temp.path().join("models").exists());
}

#[test]
fn test_train_missing_config_file() {
    let temp = TempDir::new().unwrap();

    bsort(temp.path())
        .args(["train", "--config", "nope.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ConfigNotFound"))
        .stderr(predicate::str::contains("nope.yaml"));
}

#[test]
fn test_infer_saves_result() {
    let temp = infer_workspace();
    write(&temp.path().join("cap.jpg"), "jpeg bytes");

    bsort(temp.path())
        .args(["infer", "--config", "settings.yaml", "--image", "cap.jpg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No bottle caps detected"));

    assert!(temp.path().join("cap_result.jpg").is_file());
    assert!(temp.path().join("cap.jpg").is_file());
}

#[test]
fn test_infer_show_does_not_save() {
    let temp = infer_workspace();
    write(&temp.path().join("cap.jpg"), "jpeg bytes");

    bsort(temp.path())
        .args(["infer", "--config", "settings.yaml", "--image", "cap.jpg", "--show"])
        .assert()
        .success();
    assert!(!temp.path().join("cap_result.jpg").exists());
}

#[test]
fn test_infer_missing_image() {
    let temp = infer_workspace();

    bsort(temp.path())
        .args(["infer", "--config", "settings.yaml", "--image", "missing.jpg"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ImageNotFound"))
        .stderr(predicate::str::contains("missing.jpg"));
    assert!(!temp.path().join("missing_result.jpg").exists());
}

#[test]
fn test_infer_missing_image_argument() {
    let temp = infer_workspace();

    bsort(temp.path())
        .args(["infer", "--config", "settings.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MissingArgument"))
        .stderr(predicate::str::contains("--image"));
}

#[test]
fn test_infer_missing_weights() {
    let temp = infer_workspace();
    write(&temp.path().join("cap.jpg"), "jpeg bytes");
    std::fs::remove_file(temp.path().join("models/best.pt")).unwrap();

    bsort(temp.path())
        .args(["infer", "--config", "settings.yaml", "--image", "cap.jpg"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ModelNotFound"))
        .stderr(predicate::str::contains("best.pt"));
    assert!(!temp.path().join("cap_result.jpg").exists());
}
