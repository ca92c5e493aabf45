//! End-to-end runs of the rdelta binary.

use assert_cmd::Command;
use tempfile::TempDir;

fn rdelta() -> Command {
    Command::cargo_bin("rdelta").expect("binary builds")
}

#[test]
fn signature_delta_patch_through_the_binary() {
    let dir = TempDir::new().expect("temp dir");
    let basis_path = dir.path().join("basis.bin");
    let new_path = dir.path().join("new.bin");
    let sig_path = dir.path().join("basis.sig");
    let delta_path = dir.path().join("new.delta");
    let out_path = dir.path().join("rebuilt.bin");

    let basis: Vec<u8> = (0..30_000u32).map(|v| (v * 29 % 256) as u8).collect();
    let mut new_data = basis.clone();
    new_data.splice(5000..5000, b"inserted by the cli test".iter().copied());
    std::fs::write(&basis_path, &basis).expect("write basis");
    std::fs::write(&new_path, &new_data).expect("write new");

    rdelta()
        .arg("signature")
        .arg(&basis_path)
        .arg("-o")
        .arg(&sig_path)
        .assert()
        .success();

    rdelta()
        .arg("delta")
        .arg(&sig_path)
        .arg(&new_path)
        .arg("-o")
        .arg(&delta_path)
        .assert()
        .success();

    let delta_len = std::fs::metadata(&delta_path).expect("delta written").len();
    assert!(delta_len < new_data.len() as u64, "delta should compress");

    rdelta()
        .arg("patch")
        .arg(&basis_path)
        .arg(&delta_path)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .success();

    assert_eq!(std::fs::read(&out_path).expect("read rebuilt"), new_data);
}

#[test]
fn explicit_parameters_are_accepted() {
    let dir = TempDir::new().expect("temp dir");
    let basis_path = dir.path().join("basis.bin");
    let sig_path = dir.path().join("basis.sig");
    std::fs::write(&basis_path, vec![5u8; 2048]).expect("write basis");

    rdelta()
        .arg("signature")
        .arg(&basis_path)
        .arg("-o")
        .arg(&sig_path)
        .arg("--block-size")
        .arg("128")
        .arg("--strong-length")
        .arg("8")
        .arg("--format")
        .arg("md4")
        .assert()
        .success();

    // header + 16 entries of (4 weak + 8 strong)
    assert_eq!(std::fs::metadata(&sig_path).expect("sig written").len(), 12 + 16 * 12);
}

#[test]
fn missing_basis_is_reported_on_stderr() {
    let dir = TempDir::new().expect("temp dir");
    let sig_path = dir.path().join("never.sig");

    rdelta()
        .arg("signature")
        .arg(dir.path().join("missing.bin"))
        .arg("-o")
        .arg(&sig_path)
        .assert()
        .failure()
        .stderr(predicates::str::contains("source not found"));
}

#[test]
fn corrupt_signature_is_reported_on_stderr() {
    let dir = TempDir::new().expect("temp dir");
    let sig_path = dir.path().join("bad.sig");
    let new_path = dir.path().join("new.bin");
    std::fs::write(&sig_path, b"not a signature").expect("write garbage");
    std::fs::write(&new_path, b"new data").expect("write new");

    rdelta()
        .arg("delta")
        .arg(&sig_path)
        .arg(&new_path)
        .arg("-o")
        .arg(dir.path().join("out.delta"))
        .assert()
        .failure()
        .stderr(predicates::str::contains("signature"));
}
