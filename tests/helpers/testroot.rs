// A per-test sandbox: a build area holding the manifest and payload, and a
// target area that `LocalEnv` installs into.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use setupkit::adapters::LocalEnv;
use setupkit::manifest::Manifest;

#[derive(Debug)]
pub struct TestRoot {
    td: tempfile::TempDir,
}

impl TestRoot {
    /// The target area exists up front, the way a real machine's does.
    pub fn new() -> Self {
        let td = tempfile::TempDir::new().expect("tempdir");
        std::fs::create_dir_all(td.path().join("target")).unwrap();
        Self { td }
    }

    pub fn path(&self) -> &Path {
        self.td.path()
    }

    pub fn build_dir(&self) -> PathBuf {
        self.path().join("build")
    }

    pub fn target(&self) -> PathBuf {
        self.path().join("target")
    }

    pub fn env(&self) -> LocalEnv {
        LocalEnv::rooted(&self.target())
    }

    /// Write a payload file under the build area (`rel` uses `/`).
    pub fn payload(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let p = self.build_dir().join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(&p, bytes).unwrap();
        p
    }

    /// Write `text` as the manifest and load it.
    pub fn manifest(&self, text: &str) -> Manifest {
        let p = self.build_dir().join("setup.iss");
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(&p, text).unwrap();
        Manifest::load(&p).expect("valid manifest")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.build_dir().join("setup.iss")
    }

    pub fn installed(&self, rel: &str) -> PathBuf {
        self.target().join(rel)
    }

    /// Every file and directory under the target area, installer state
    /// included, with file contents, keyed by relative path.
    pub fn snapshot(&self) -> BTreeMap<String, Option<Vec<u8>>> {
        let mut out = BTreeMap::new();
        let root = self.target();
        if root.exists() {
            walk(&root, &root, &mut out);
        }
        out
    }
}

fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Option<Vec<u8>>>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let p = entry.path();
        let rel = p.strip_prefix(root).unwrap().to_string_lossy().into_owned();
        if entry.file_type().unwrap().is_dir() {
            out.insert(rel, None);
            walk(root, &p, out);
        } else {
            out.insert(rel, Some(std::fs::read(&p).unwrap()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testroot_unique_and_snapshot_sees_state() {
        let a = TestRoot::new();
        let b = TestRoot::new();
        assert_ne!(a.path(), b.path());
        std::fs::create_dir_all(a.installed(".setupkit")).unwrap();
        std::fs::write(a.installed(".setupkit/x.uninstall.jsonl"), b"{}").unwrap();
        let snap = a.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[".setupkit/x.uninstall.jsonl"].as_deref(), Some(&b"{}"[..]));
        assert!(b.snapshot().is_empty());
    }
}
