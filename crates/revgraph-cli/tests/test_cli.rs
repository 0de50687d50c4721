use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn get_test_dir() -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests");
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_cli_generate_toy_and_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("toy_stats.json");

    let mut cmd = Command::cargo_bin("revgraph")?;
    cmd.arg("generate").arg(&file).arg("--toy");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("3 users, 3 reviews, 5 train, 1 test"));

    let mut cmd = Command::cargo_bin("revgraph")?;
    cmd.arg("stats").arg(&file);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Users:            3"))
        .stdout(predicate::str::contains("Interactions:     6"))
        .stdout(predicate::str::contains("Isolated reviews: 1"));

    fs::remove_file(file)?;
    Ok(())
}

#[test]
fn test_cli_stats_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let file = dir.join("synthetic_stats.json");

    let mut cmd = Command::cargo_bin("revgraph")?;
    cmd.arg("generate")
        .arg(&file)
        .arg("--users")
        .arg("20")
        .arg("--reviews")
        .arg("30")
        .arg("--history")
        .arg("4")
        .arg("--seed")
        .arg("7");
    cmd.assert().success();

    let output = Command::cargo_bin("revgraph")?
        .arg("stats")
        .arg(&file)
        .arg("--json")
        .output()?;
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(stats["num_users"], 20);
    assert_eq!(stats["num_reviews"], 30);
    assert_eq!(
        stats["num_train"].as_u64().unwrap() + stats["num_test"].as_u64().unwrap(),
        80
    );

    fs::remove_file(file)?;
    Ok(())
}

#[test]
fn test_cli_train_toy_one_epoch() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let data = dir.join("toy_train.json");
    let report = dir.join("toy_report.json");

    Command::cargo_bin("revgraph")?
        .arg("generate")
        .arg(&data)
        .arg("--toy")
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("revgraph")?;
    cmd.arg("train")
        .arg(&data)
        .arg("--epochs")
        .arg("1")
        .arg("--batch-size")
        .arg("2")
        .arg("--embed-dim")
        .arg("8")
        .arg("--cpu")
        .arg("--report")
        .arg(&report);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("epoch   1"))
        .stdout(predicate::str::contains("Best rmse/mae"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(json["history"].as_array().unwrap().len(), 1);
    let rmse = json["best_rmse"].as_f64().unwrap();
    let mae = json["best_mae"].as_f64().unwrap();
    assert!(rmse.is_finite() && rmse >= 0.0);
    assert!(mae.is_finite() && mae >= 0.0);

    fs::remove_file(data)?;
    fs::remove_file(report)?;
    Ok(())
}

#[test]
fn test_cli_train_adamw() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();
    let data = dir.join("adamw_train.json");

    Command::cargo_bin("revgraph")?
        .args(["generate", "--users", "12", "--reviews", "15", "--history", "3"])
        .arg(&data)
        .assert()
        .success();

    Command::cargo_bin("revgraph")?
        .arg("train")
        .arg(&data)
        .args(["--epochs", "2", "--batch-size", "8", "--embed-dim", "8"])
        .args(["--optimizer", "adamw", "--cpu"])
        .assert()
        .success()
        .stdout(predicate::str::contains("epoch   2"));

    fs::remove_file(data)?;
    Ok(())
}

#[test]
fn test_cli_rejects_bad_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = get_test_dir();

    Command::cargo_bin("revgraph")?
        .arg("stats")
        .arg(dir.join("does_not_exist.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load dataset"));

    let data = dir.join("bad_batch.json");
    Command::cargo_bin("revgraph")?
        .arg("generate")
        .arg(&data)
        .arg("--toy")
        .assert()
        .success();
    Command::cargo_bin("revgraph")?
        .arg("train")
        .arg(&data)
        .args(["--batch-size", "1", "--cpu"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("batch_size"));

    Command::cargo_bin("revgraph")?
        .arg("train")
        .arg(&data)
        .args(["--optimizer", "sgd"])
        .assert()
        .failure();

    fs::remove_file(data)?;
    Ok(())
}
