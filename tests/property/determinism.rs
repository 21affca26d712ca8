//! Property-based tests for determinism guarantees

use imprint::tree::hasher::compute_content_hash;
use imprint::tree::path::relative_key;
use imprint::tree::hash_tree;
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn files_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map("[a-z]{1,8}", prop::collection::vec(any::<u8>(), 0..64), 1..6)
}

fn write_all<'a>(root: &Path, files: impl Iterator<Item = (&'a String, &'a Vec<u8>)>) {
    fs::create_dir_all(root).unwrap();
    for (name, content) in files {
        fs::write(root.join(name), content).unwrap();
    }
}

fn runner() -> TestRunner {
    TestRunner::new(Config::with_cases(32))
}

/// Digest equals the fold over name-sorted content hashes, whatever the write order
#[test]
fn test_digest_is_sorted_fold_of_content_hashes() {
    runner()
        .run(&files_strategy(), |files| {
            let temp_dir = TempDir::new().unwrap();
            let forward = temp_dir.path().join("forward");
            let reverse = temp_dir.path().join("reverse");
            write_all(&forward, files.iter());
            write_all(&reverse, files.iter().rev());

            let mut expected = Sha256::new();
            for content in files.values() {
                expected.update(compute_content_hash(content));
            }
            let expected = hex::encode(expected.finalize());

            let forward_digest = hash_tree(&forward, &["*"]).unwrap();
            let reverse_digest = hash_tree(&reverse, &["*"]).unwrap();

            prop_assert_eq!(forward_digest, reverse_digest);
            prop_assert_eq!(forward_digest.to_hex(), expected);
            Ok(())
        })
        .unwrap();
}

/// Changing any single file changes the digest
#[test]
fn test_content_change_changes_digest() {
    runner()
        .run(&(files_strategy(), any::<prop::sample::Index>()), |(files, index)| {
            let temp_dir = TempDir::new().unwrap();
            write_all(temp_dir.path(), files.iter());
            let before = hash_tree(temp_dir.path(), &["*"]).unwrap();

            let name = files.keys().nth(index.index(files.len())).unwrap();
            let mut changed = files[name].clone();
            changed.push(0x2a);
            fs::write(temp_dir.path().join(name), changed).unwrap();

            prop_assert_ne!(before, hash_tree(temp_dir.path(), &["*"]).unwrap());
            Ok(())
        })
        .unwrap();
}

/// Compiled artifacts never change the digest
#[test]
fn test_compiled_artifacts_never_change_digest() {
    let artifacts = prop::collection::vec(
        ("[a-z]{1,8}", prop::sample::select(vec!["pyc", "pyd", "pyo"]), any::<Vec<u8>>()),
        1..5,
    );

    runner()
        .run(&(files_strategy(), artifacts), |(files, artifacts)| {
            let temp_dir = TempDir::new().unwrap();
            write_all(temp_dir.path(), files.iter());
            let before = hash_tree(temp_dir.path(), &["**/*"]).unwrap();

            for (stem, extension, content) in &artifacts {
                let dir = temp_dir.path().join("__pycache__");
                fs::create_dir_all(&dir).unwrap();
                fs::write(dir.join(format!("{}.{}", stem, extension)), content).unwrap();
                fs::write(temp_dir.path().join(format!("{}.{}", stem, extension)), content)
                    .unwrap();
            }

            prop_assert_eq!(before, hash_tree(temp_dir.path(), &["**/*"]).unwrap());
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Sort keys are the components joined by "/" on every platform
    #[test]
    fn test_relative_key_joins_components(components in prop::collection::vec("[a-zA-Z0-9_.-]{1,6}", 1..5)) {
        prop_assume!(components.iter().all(|c| c != "." && c != ".."));
        let path: PathBuf = components.iter().collect();
        prop_assert_eq!(relative_key(&path), components.join("/"));
    }
}
