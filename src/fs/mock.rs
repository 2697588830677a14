// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(BTreeSet<String>), // Child names
}

/// In-memory filesystem.
///
/// Paths are normalised by dropping `.` components, so `"./app/a.html"` and
/// `"app/a.html"` name the same entry; the empty path is the root. Clones
/// share the same storage.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::new(), MockEntry::Dir(BTreeSet::new()));

        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let mut entries = self.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dir_entry(&mut entries, parent);
        }
        Self::link_child(&mut entries, &path);
        entries.insert(path, MockEntry::File(content.into()));
    }

    /// Contents of a file, if present (test helper).
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().get(&key(path.as_ref())) {
            Some(MockEntry::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Every file path currently stored, sorted (test helper).
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn ensure_dir_entry(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        if let Some(parent) = path.parent() {
            Self::ensure_dir_entry(entries, parent);
        }
        Self::link_child(entries, path);
        entries.insert(path.to_path_buf(), MockEntry::Dir(BTreeSet::new()));
    }

    fn link_child(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            children.insert(name.to_string_lossy().into_owned());
        }
    }

    fn unlink_child(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            children.remove(name.to_string_lossy().as_ref());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_dir(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_key = key(from);
        let to_key = key(to);
        let mut entries = self.lock();
        let entry = match entries.remove(&from_key) {
            Some(entry @ MockEntry::File(_)) => entry,
            Some(dir) => {
                entries.insert(from_key, dir);
                return Err(anyhow!("renaming directories is not supported: {:?}", from));
            }
            None => return Err(anyhow!("File not found: {:?}", from)),
        };
        Self::unlink_child(&mut entries, &from_key);
        if let Some(parent) = to_key.parent() {
            Self::ensure_dir_entry(&mut entries, parent);
        }
        Self::link_child(&mut entries, &to_key);
        entries.insert(to_key, entry);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let k = key(path);
        let mut entries = self.lock();
        match entries.get(&k) {
            Some(MockEntry::File(_)) => {
                entries.remove(&k);
                Self::unlink_child(&mut entries, &k);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let k = key(path);
        let mut entries = self.lock();
        if !matches!(entries.get(&k), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        entries.retain(|p, _| !p.starts_with(&k));
        if k.as_os_str().is_empty() {
            entries.insert(PathBuf::new(), MockEntry::Dir(BTreeSet::new()));
        } else {
            Self::unlink_child(&mut entries, &k);
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
