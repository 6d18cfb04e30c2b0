use sensa_events::ConsumerType;
use sensa_icc::HandleDescriptor;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// The set of regions a producer process publishes, as one JSON document
/// consumer processes read to find what to attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDirectory {
    pub producer_pid: u32,
    pub regions: Vec<HandleDescriptor>,
}

impl RegionDirectory {
    pub fn new(producer_pid: u32) -> Self {
        Self {
            producer_pid,
            regions: Vec::new(),
        }
    }

    /// Adds or replaces the entry for `desc.consumer_type`.
    pub fn insert(&mut self, desc: HandleDescriptor) {
        self.regions.retain(|d| d.consumer_type != desc.consumer_type);
        self.regions.push(desc);
    }

    pub fn find(&self, consumer: ConsumerType) -> Option<&HandleDescriptor> {
        self.regions.iter().find(|d| d.consumer_type == consumer)
    }

    /// Writes the document next to `path` and renames it into place, so a
    /// reader never sees a half-written file.
    pub fn publish(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let json = std::fs::read(path)?;
        serde_json::from_slice(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn desc(consumer: ConsumerType, path: &str) -> HandleDescriptor {
        HandleDescriptor {
            path: PathBuf::from(path),
            size: 128,
            consumer_type: consumer,
        }
    }

    #[test]
    fn insert_replaces_by_type() {
        let mut dir = RegionDirectory::new(1);
        dir.insert(desc(ConsumerType::Light, "/dev/shm/a"));
        dir.insert(desc(ConsumerType::Motion, "/dev/shm/b"));
        dir.insert(desc(ConsumerType::Light, "/dev/shm/c"));
        assert_eq!(dir.regions.len(), 2);
        assert_eq!(
            dir.find(ConsumerType::Light).unwrap().path,
            PathBuf::from("/dev/shm/c")
        );
        assert!(dir.find(ConsumerType::Orientation).is_none());
    }

    #[test]
    fn publish_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("regions.json");
        let mut dir = RegionDirectory::new(77);
        dir.insert(desc(ConsumerType::OrientationAbsolute, "/dev/shm/x"));

        dir.publish(&path).unwrap();
        assert!(!tmp.path().join("regions.json.tmp").exists());
        assert_eq!(RegionDirectory::load(&path).unwrap(), dir);
    }

    #[test]
    fn garbage_is_invalid_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("regions.json");
        std::fs::write(&path, b"not json").unwrap();
        let err = RegionDirectory::load(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
