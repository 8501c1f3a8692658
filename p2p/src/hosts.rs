//! The persisted pool of known peer addresses `session_seed` and `session_outbound`
//! draw candidates from.
use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use bn_common::error::Error;
use bn_common::Authority;

#[derive(Debug, Clone)]
struct Entry {
    last_seen: u32,
}

/// An in-memory pool of candidate peer addresses, persisted to a flat text file
/// (one `host:port` per line).
pub struct Hosts {
    path: PathBuf,
    capacity: usize,
    entries: HashMap<Authority, Entry>,
}

impl Hosts {
    /// Create an empty pool bounded to `capacity` entries, persisted at `path`.
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self { path: path.into(), capacity, entries: HashMap::new() }
    }

    /// Load entries from the persisted file at `path`, ignoring malformed lines.
    /// A missing file is treated as an empty pool, not an error.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, Error> {
        let path = path.into();
        let mut hosts = Self::new(path.clone(), capacity);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Ok(authority) = line.parse::<Authority>() {
                        hosts.insert(authority, 0);
                    }
                }
                Ok(hosts)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(hosts),
            Err(err) => Err(Error::FileSystem(err.to_string())),
        }
    }

    /// Persist the current pool to [`Hosts::path`] as one `host:port` per line.
    pub fn save(&self) -> Result<(), Error> {
        self.save_to(&self.path)
    }

    /// Writes via a temp file in the same directory, then renames over `path`, so a
    /// crash or a concurrent reader never observes a truncated hosts file.
    fn save_to(&self, path: &Path) -> Result<(), Error> {
        let mut buf = String::new();
        for authority in self.entries.keys() {
            buf.push_str(&authority.to_string());
            buf.push('\n');
        }

        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let mut file = fs::File::create(&tmp_path).map_err(|e| Error::FileSystem(e.to_string()))?;
        file.write_all(buf.as_bytes()).map_err(|e| Error::FileSystem(e.to_string()))?;
        file.sync_all().map_err(|e| Error::FileSystem(e.to_string()))?;
        drop(file);
        fs::rename(&tmp_path, path).map_err(|e| Error::FileSystem(e.to_string()))
    }

    /// Insert or refresh `authority` with `last_seen`. Evicts the least-recently-seen
    /// entry if the pool is already at capacity and `authority` is new.
    pub fn insert(&mut self, authority: Authority, last_seen: u32) {
        if !self.entries.contains_key(&authority) && self.entries.len() >= self.capacity {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(a, _)| *a)
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries
            .entry(authority)
            .and_modify(|e| e.last_seen = e.last_seen.max(last_seen))
            .or_insert(Entry { last_seen });
    }

    /// Remove `authority` from the pool.
    pub fn remove(&mut self, authority: &Authority) {
        self.entries.remove(authority);
    }

    /// Number of entries currently held.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the pool holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw up to `n` distinct candidates at random, newest-seen weighted first.
    /// Returns [`Error::NotFound`] if the pool is empty.
    pub fn sample(&self, n: usize) -> Result<Vec<Authority>, Error> {
        if self.entries.is_empty() {
            return Err(Error::NotFound);
        }
        let mut all: Vec<Authority> = self.entries.keys().copied().collect();
        fastrand::shuffle(&mut all);
        all.truncate(n.max(1));
        Ok(all)
    }

    /// All known authorities, most-recently-seen first.
    pub fn all(&self) -> Vec<Authority> {
        let mut all: Vec<(Authority, u32)> =
            self.entries.iter().map(|(a, e)| (*a, e.last_seen)).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1));
        all.into_iter().map(|(a, _)| a).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn authority(n: u8) -> Authority {
        Authority::from_ipv4(Ipv4Addr::new(10, 0, 0, n), 8333)
    }

    #[test]
    fn evicts_oldest_when_over_capacity() {
        let mut hosts = Hosts::new("unused.txt", 2);
        hosts.insert(authority(1), 10);
        hosts.insert(authority(2), 20);
        hosts.insert(authority(3), 30);
        assert_eq!(hosts.count(), 2);
        assert!(!hosts.all().contains(&authority(1)));
    }

    #[test]
    fn sample_empty_pool_is_not_found() {
        let hosts = Hosts::new("unused.txt", 10);
        assert!(matches!(hosts.sample(1), Err(Error::NotFound)));
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("bn-hosts-test-{}", fastrand::u64(..)));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hosts.txt");

        let mut hosts = Hosts::new(&path, 10);
        hosts.insert(authority(1), 1);
        hosts.insert(authority(2), 2);
        hosts.save().unwrap();

        let reloaded = Hosts::load(&path, 10).unwrap();
        assert_eq!(reloaded.count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
