//! Profile persistence with file locking.
//!
//! The store never does I/O itself. It converts to and from a
//! [`ProfileSnapshot`], and a [`ProfileRepository`] moves snapshots in and
//! out of durable storage. Missing or malformed data always loads as an
//! empty store.

use crate::{Error, Profile, ProfileId, ProfileStore, Result, MAX_PROFILES};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Fixed storage key for the profile blob
pub const PROFILES_KEY: &str = "user_profiles";

/// Serializable form of a [`ProfileStore`]
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ProfileSnapshot {
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub selected_id: Option<ProfileId>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Accepted on-disk shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredProfiles {
    Snapshot(ProfileSnapshot),
    /// Bare array of profiles with no selection
    Legacy(Vec<Profile>),
}

impl ProfileStore {
    /// Capture the collection and selection
    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            profiles: self.profiles.clone(),
            selected_id: self.selected.clone(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Rebuild a store from a snapshot
    ///
    /// Entries that would break the store's invariants are dropped with a
    /// warning: duplicate ids, empty names, invalid metrics, and anything
    /// past [`MAX_PROFILES`]. BMR is recomputed from the stored metrics and
    /// a selection pointing at a missing profile is cleared.
    pub fn from_snapshot(snapshot: ProfileSnapshot) -> Self {
        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(MAX_PROFILES);

        for mut profile in snapshot.profiles {
            if profiles.len() >= MAX_PROFILES {
                tracing::warn!(
                    "Dropping stored profile {}: more than {} profiles stored",
                    profile.id,
                    MAX_PROFILES
                );
                continue;
            }
            if !seen.insert(profile.id.clone()) {
                tracing::warn!("Dropping stored profile with duplicate id {}", profile.id);
                continue;
            }
            if profile.name.trim().is_empty() {
                tracing::warn!("Dropping stored profile {} with empty name", profile.id);
                continue;
            }
            if let Err(e) = profile.metrics.validate() {
                tracing::warn!("Dropping stored profile {}: {}", profile.id, e);
                continue;
            }

            let bmr = profile.metrics.bmr();
            if bmr != profile.bmr {
                tracing::debug!(
                    "Stored BMR for {} was {}, recomputed {}",
                    profile.id,
                    profile.bmr,
                    bmr
                );
                profile.bmr = bmr;
            }
            profiles.push(profile);
        }

        let selected = snapshot.selected_id.filter(|id| {
            let present = profiles.iter().any(|p| &p.id == id);
            if !present {
                tracing::warn!("Stored selection {} has no matching profile, clearing", id);
            }
            present
        });

        Self { profiles, selected }
    }

    /// Serialize to the persisted text blob
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Parse a persisted text blob
    ///
    /// Malformed input yields an empty store.
    pub fn from_json(contents: &str) -> Self {
        match serde_json::from_str::<StoredProfiles>(contents) {
            Ok(StoredProfiles::Snapshot(snapshot)) => Self::from_snapshot(snapshot),
            Ok(StoredProfiles::Legacy(profiles)) => {
                tracing::debug!("Loaded legacy profile array ({} entries)", profiles.len());
                Self::from_snapshot(ProfileSnapshot {
                    profiles,
                    ..Default::default()
                })
            }
            Err(e) => {
                tracing::warn!("Failed to parse stored profiles: {}. Using empty store.", e);
                Self::default()
            }
        }
    }
}

/// Durable storage for the profile collection and selection
pub trait ProfileRepository {
    /// Load the stored profiles; never fails on missing or malformed data
    fn load_profiles(&self) -> Result<ProfileStore>;

    /// Persist the collection and selection
    fn save_profiles(&self, store: &ProfileStore) -> Result<()>;

    /// Exclude other writers until the returned guard is dropped
    ///
    /// Repositories without cross-process writers keep the default no-op.
    fn lock_for_update(&self) -> Result<UpdateLock> {
        Ok(UpdateLock::default())
    }
}

/// Writer exclusion held for one load-modify-save cycle
///
/// Dropping the guard closes the lock file, which releases the lock.
#[derive(Debug, Default)]
pub struct UpdateLock {
    _file: Option<File>,
}

/// Load the store, modify it, and save it back
///
/// Runs under [`ProfileRepository::lock_for_update`], so concurrent
/// updates are applied one after another. Nothing is written if `f` fails.
pub fn update_profiles<R, F, T>(repo: &R, f: F) -> Result<T>
where
    R: ProfileRepository + ?Sized,
    F: FnOnce(&mut ProfileStore) -> Result<T>,
{
    let _lock = repo.lock_for_update()?;
    let mut store = repo.load_profiles()?;
    let out = f(&mut store)?;
    repo.save_profiles(&store)?;
    Ok(out)
}

/// JSON file repository
///
/// Writers serialize on a sidecar `<key>.lock` file; the data file itself is
/// only ever replaced by rename, so readers see either the old or the new
/// contents.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Repository for an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Repository at the standard location inside a data directory
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(format!("{}.json", PROFILES_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn read_shared(&self) -> std::io::Result<String> {
        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let read = (&file).read_to_string(&mut contents);
        file.unlock()?;
        read.map(|_| contents)
    }
}

impl ProfileRepository for JsonFileRepository {
    fn load_profiles(&self) -> Result<ProfileStore> {
        if !self.path.exists() {
            tracing::info!("No profile file at {:?}, starting with no profiles", self.path);
            return Ok(ProfileStore::default());
        }

        match self.read_shared() {
            Ok(contents) => {
                let store = ProfileStore::from_json(&contents);
                tracing::debug!("Loaded {} profiles from {:?}", store.len(), self.path);
                Ok(store)
            }
            Err(e) => {
                tracing::warn!(
                    "Cannot read profile file {:?}: {}. Using empty store.",
                    self.path,
                    e
                );
                Ok(ProfileStore::default())
            }
        }
    }

    fn save_profiles(&self, store: &ProfileStore) -> Result<()> {
        let parent = self.parent_dir();
        std::fs::create_dir_all(parent)?;

        let contents = store.to_json()?;
        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} profiles to {:?}", store.len(), self.path);
        Ok(())
    }

    fn lock_for_update(&self) -> Result<UpdateLock> {
        std::fs::create_dir_all(self.parent_dir())?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        tracing::trace!("Holding profile lock {:?}", self.lock_path());
        Ok(UpdateLock { _file: Some(file) })
    }
}

/// Repository holding the blob in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    blob: Mutex<Option<String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-seeded with raw stored text
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// Current raw stored text
    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|b| b.clone())
    }
}

impl ProfileRepository for MemoryRepository {
    fn load_profiles(&self) -> Result<ProfileStore> {
        let blob = self
            .blob
            .lock()
            .map_err(|_| Error::Other("profile blob lock poisoned".into()))?;
        Ok(blob
            .as_deref()
            .map(ProfileStore::from_json)
            .unwrap_or_default())
    }

    fn save_profiles(&self, store: &ProfileStore) -> Result<()> {
        let contents = store.to_json()?;
        let mut blob = self
            .blob
            .lock()
            .map_err(|_| Error::Other("profile blob lock poisoned".into()))?;
        *blob = Some(contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Gender, Metrics};

    fn metrics(gender: Gender, weight: f64) -> Metrics {
        Metrics {
            age: 30,
            gender,
            height: 175.0,
            weight,
        }
    }

    fn populated_store() -> ProfileStore {
        let mut store = ProfileStore::new();
        store.create(metrics(Gender::Male, 70.0), "Alex").unwrap();
        let sam = store.create(metrics(Gender::Female, 58.5), "Sam").unwrap();
        store.create(metrics(Gender::Male, 91.2), "Kim").unwrap();
        store.select(Some(&sam.id)).unwrap();
        store
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(temp_dir.path());

        let store = populated_store();
        repo.save_profiles(&store).unwrap();

        let loaded = repo.load_profiles().unwrap();
        assert_eq!(loaded.list(), store.list());
        assert_eq!(loaded.selected_id(), store.selected_id());
        assert_eq!(loaded.selected().unwrap().name, "Sam");
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(temp_dir.path().join("missing.json"));

        let store = repo.load_profiles().unwrap();
        assert!(store.is_empty());
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_corrupted_file_returns_empty() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(temp_dir.path());
        std::fs::write(repo.path(), "{ invalid json }").unwrap();

        let store = repo.load_profiles().unwrap();
        assert!(store.is_empty());
        assert!(store.selected_id().is_none());
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(temp_dir.path());

        repo.save_profiles(&ProfileStore::default()).unwrap();

        assert!(repo.path().exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "user_profiles.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only user_profiles.json, found extras: {:?}",
            extras
        );
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");

        let results: Vec<Result<Profile>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..6)
                .map(|i| {
                    let data_dir = data_dir.clone();
                    scope.spawn(move || {
                        let repo = JsonFileRepository::in_dir(&data_dir);
                        update_profiles(&repo, |store| {
                            store.create(metrics(Gender::Male, 70.0 + i as f64), &format!("p{}", i))
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let created = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(Error::CapacityExceeded { max: 3 })))
            .count();
        assert_eq!(created, MAX_PROFILES);
        assert_eq!(rejected, 6 - MAX_PROFILES);

        let loaded = JsonFileRepository::in_dir(&data_dir).load_profiles().unwrap();
        assert_eq!(loaded.len(), MAX_PROFILES);
        for result in results.iter().flatten() {
            assert!(loaded.get(&result.id).is_some());
        }
    }

    #[test]
    fn test_update_leaves_lock_file_beside_data() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::in_dir(temp_dir.path());

        update_profiles(&repo, |store| store.select(None)).unwrap();

        assert_eq!(repo.lock_path(), temp_dir.path().join("user_profiles.lock"));
        assert!(repo.lock_path().exists());
        assert!(repo.path().exists());
    }

    #[test]
    fn test_update_profiles_pattern() {
        let repo = MemoryRepository::new();

        let created = update_profiles(&repo, |store| {
            let p = store.create(metrics(Gender::Male, 70.0), "Alex")?;
            store.select(Some(&p.id))?;
            Ok(p)
        })
        .unwrap();

        let loaded = repo.load_profiles().unwrap();
        assert_eq!(loaded.selected_id(), Some(&created.id));
    }

    #[test]
    fn test_update_profiles_failure_saves_nothing() {
        let repo = MemoryRepository::new();
        update_profiles(&repo, |store| {
            store.create(metrics(Gender::Male, 70.0), "Alex").map(|_| ())
        })
        .unwrap();
        let before = repo.blob();

        let result = update_profiles(&repo, |store| {
            store.create(metrics(Gender::Male, 70.0), "second")?;
            store.remove(&ProfileId::from("missing"))
        });
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(repo.blob(), before);
        assert_eq!(repo.load_profiles().unwrap().len(), 1);
    }

    #[test]
    fn test_legacy_array_blob() {
        let blob = r#"[
            {"id":"1718000000000","name":"Alex","age":30,"gender":"MALE","height":175,"weight":70,"bmr":1648.75},
            {"id":"1718000000001","name":"Sam","age":25,"gender":"FEMALE","height":165,"weight":60,"bmr":1345.25}
        ]"#;
        let store = MemoryRepository::with_blob(blob).load_profiles().unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[0].id, ProfileId::from("1718000000000"));
        assert_eq!(store.list()[1].metrics.gender, Gender::Female);
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_stale_bmr_is_recomputed_on_load() {
        let blob = r#"{"profiles":[{"id":"a","name":"Alex","age":30,"gender":"MALE","height":175,"weight":70,"bmr":1.0}],"selected_id":"a"}"#;
        let store = ProfileStore::from_json(blob);
        assert_eq!(store.selected().unwrap().bmr, 1648.75);
    }

    #[test]
    fn test_dangling_selection_is_cleared() {
        let blob = r#"{"profiles":[{"id":"a","name":"Alex","age":30,"gender":"MALE","height":175,"weight":70,"bmr":1648.75}],"selected_id":"gone"}"#;
        let store = ProfileStore::from_json(blob);
        assert_eq!(store.len(), 1);
        assert!(store.selected_id().is_none());
    }

    #[test]
    fn test_invalid_and_duplicate_entries_dropped() {
        let snapshot = ProfileSnapshot {
            profiles: vec![
                Profile {
                    id: "a".into(),
                    name: "Alex".into(),
                    metrics: metrics(Gender::Male, 70.0),
                    bmr: 0.0,
                },
                Profile {
                    id: "a".into(),
                    name: "Duplicate".into(),
                    metrics: metrics(Gender::Male, 70.0),
                    bmr: 0.0,
                },
                Profile {
                    id: "b".into(),
                    name: "Broken".into(),
                    metrics: metrics(Gender::Male, -3.0),
                    bmr: 0.0,
                },
                Profile {
                    id: "c".into(),
                    name: " ".into(),
                    metrics: metrics(Gender::Male, 70.0),
                    bmr: 0.0,
                },
            ],
            selected_id: Some("b".into()),
            saved_at: None,
        };

        let store = ProfileStore::from_snapshot(snapshot);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].name, "Alex");
        assert!(store.selected_id().is_none());
    }

    #[test]
    fn test_overfull_blob_truncated_to_capacity() {
        let profiles = (0..5)
            .map(|i| Profile {
                id: ProfileId::from(format!("p{}", i)),
                name: format!("Person {}", i),
                metrics: metrics(Gender::Female, 60.0),
                bmr: 0.0,
            })
            .collect();
        let store = ProfileStore::from_snapshot(ProfileSnapshot {
            profiles,
            selected_id: Some("p4".into()),
            saved_at: None,
        });

        assert_eq!(store.len(), MAX_PROFILES);
        assert_eq!(store.list()[2].id, ProfileId::from("p2"));
        assert!(store.selected_id().is_none());
    }

    #[test]
    fn test_memory_repository_roundtrip() {
        let repo = MemoryRepository::new();
        assert!(repo.load_profiles().unwrap().is_empty());

        let store = populated_store();
        repo.save_profiles(&store).unwrap();
        let loaded = repo.load_profiles().unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_roundtrip_preserves_arbitrary_floats() {
        let mut samples = vec![(81.51408755140875, 104.34110386822077)];
        // Values with long decimal expansions
        let mut w = 10.000000000000002;
        let mut h = 50.00000000000001;
        for _ in 0..500 {
            w = 10.0 + (w * 1.618033988749895 + 0.1) % 290.0;
            h = 50.0 + (h * 2.718281828459045 + 0.3) % 200.0;
            samples.push((w, h));
        }

        for (weight, height) in samples {
            let mut store = ProfileStore::new();
            let created = store
                .create(
                    Metrics {
                        age: 41,
                        gender: Gender::Female,
                        height,
                        weight,
                    },
                    "Float",
                )
                .unwrap();
            store.select(Some(&created.id)).unwrap();

            let loaded = ProfileStore::from_json(&store.to_json().unwrap());
            assert_eq!(
                loaded.list(),
                store.list(),
                "roundtrip changed w={} h={}",
                weight,
                height
            );
            assert_eq!(loaded.selected_id(), Some(&created.id));
        }
    }

    #[test]
    fn test_snapshot_json_shape() {
        let store = populated_store();
        let value: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();

        let first = &value["profiles"][0];
        assert_eq!(first["name"], "Alex");
        assert_eq!(first["gender"], "MALE");
        assert_eq!(first["bmr"], 1648.75);
        assert_eq!(
            value["selected_id"].as_str(),
            store.selected_id().map(|id| id.as_str())
        );
    }
}
