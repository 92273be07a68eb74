//! A single directory's manifest and the verify/update passes over it

use super::{is_hidden, DirState, PassContext, MANIFEST_FILE_NAME, MANIFEST_TEMP_SUFFIX};
use crate::error::{ManifestError, ManifestResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Checksums of the plain files directly inside one directory
///
/// Field order and the sorted `files` map keep the serialized form identical
/// to manifests written by earlier runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryManifest {
    #[serde(default = "unix_now")]
    created: i64,

    #[serde(default = "unix_now")]
    updated: i64,

    #[serde(default, deserialize_with = "null_as_empty")]
    files: BTreeMap<String, String>,

    /// Directory this manifest describes, inferred from where it was loaded
    #[serde(skip)]
    path: PathBuf,
}

/// What a recomputed checksum means for a file in an update pass
enum Change {
    New,
    Changed(String),
    Same,
}

impl DirectoryManifest {
    /// Empty manifest for a directory, stamped with the current time
    pub fn empty(dir: &Path) -> Self {
        let now = unix_now();
        Self {
            created: now,
            updated: now,
            files: BTreeMap::new(),
            path: dir.to_path_buf(),
        }
    }

    /// Load the manifest of `dir`, or an empty one if none has been written
    ///
    /// A manifest that exists but cannot be read or parsed is an error; it is
    /// never replaced by an empty manifest.
    pub fn load(dir: &Path) -> ManifestResult<Self> {
        if !dir.is_dir() {
            return Err(ManifestError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let sumfile = dir.join(MANIFEST_FILE_NAME);
        let data = match fs::read(&sumfile) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %dir.display(), "No manifest, starting empty");
                return Ok(Self::empty(dir));
            }
            Err(source) => {
                return Err(ManifestError::Read {
                    path: sumfile,
                    source,
                })
            }
        };

        let mut manifest: Self =
            serde_json::from_slice(&data).map_err(|source| ManifestError::Parse {
                path: sumfile,
                source,
            })?;
        manifest.path = dir.to_path_buf();

        debug!(
            path = %dir.display(),
            files = manifest.files.len(),
            "Loaded manifest"
        );

        Ok(manifest)
    }

    /// Directory this manifest belongs to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the persisted manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE_NAME)
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn updated(&self) -> i64 {
        self.updated
    }

    /// Recorded file name to checksum mapping
    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// Recorded checksum for a file name
    pub fn checksum(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write the manifest to disk, refreshing `updated`
    ///
    /// The document is written next to the manifest and renamed over it, so
    /// a failed write leaves the previous manifest untouched. On failure
    /// `updated` keeps its previous value.
    pub fn save(&mut self) -> ManifestResult<()> {
        let out = self.manifest_path();
        debug!(path = %out.display(), "Saving manifest");

        let previous = self.updated;
        self.updated = unix_now();

        let result = self.write_atomically(&out);
        if result.is_err() {
            self.updated = previous;
        }
        result
    }

    fn write_atomically(&self, out: &Path) -> ManifestResult<()> {
        let data = serde_json::to_vec(self).map_err(|source| ManifestError::Encode {
            path: out.to_path_buf(),
            source,
        })?;

        let tmp = self
            .path
            .join(format!("{}{}", MANIFEST_FILE_NAME, MANIFEST_TEMP_SUFFIX));

        if let Err(source) = fs::write(&tmp, &data).and_then(|()| fs::rename(&tmp, out)) {
            if tmp.is_file() {
                let _ = fs::remove_file(&tmp);
            }
            return Err(ManifestError::Write {
                path: out.to_path_buf(),
                source,
            });
        }

        Ok(())
    }

    /// Immediate plain files of the directory, sorted by name
    ///
    /// Subdirectories, hidden entries and the manifest itself are skipped.
    /// Symlinks are followed; a dangling link is still listed so that reading
    /// it fails loudly instead of the file silently disappearing.
    fn list_files(&self) -> ManifestResult<Vec<(String, PathBuf)>> {
        let read_dir_err = |source: io::Error| ManifestError::ReadDir {
            path: self.path.clone(),
            source,
        };

        let mut files = Vec::new();

        for entry in fs::read_dir(&self.path).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            let path = entry.path();

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => {
                    error!(
                        path = %path.display(),
                        "Skipping file with non UTF-8 name, it is not checksummed"
                    );
                    continue;
                }
            };

            if is_hidden(&name) {
                continue;
            }

            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => continue,
                Ok(meta) if !meta.is_file() => {
                    debug!(path = %path.display(), "Skipping special file");
                    continue;
                }
                _ => files.push((name, path)),
            }
        }

        files.sort();
        Ok(files)
    }

    /// Compare every recorded file against its current checksum
    ///
    /// Files not in the manifest are ignored. Never writes to disk.
    pub fn verify(&self, ctx: &PassContext<'_>) -> ManifestResult<DirState> {
        let mut mismatched = false;

        for (name, path) in self.list_files()? {
            let Some(recorded) = self.files.get(&name) else {
                debug!(path = %path.display(), "Skipping previously unseen file");
                continue;
            };

            debug!(path = %path.display(), "Verifying file");
            let current = ctx.checksum(&path)?;

            if &current != recorded {
                warn!(
                    path = %path.display(),
                    actual = %current,
                    expected = %recorded,
                    "Checksum mismatch"
                );
                mismatched = true;
                ctx.report_failed(path);
            } else {
                ctx.report_verified();
            }
        }

        debug!(path = %self.path.display(), "Done verifying");

        Ok(if mismatched {
            DirState::Mismatched
        } else {
            DirState::Verified
        })
    }

    /// Record new files and refresh changed checksums
    pub fn update(&mut self, ctx: &PassContext<'_>) -> ManifestResult<DirState> {
        self.add_or_update(false, ctx)
    }

    /// Record new files only; existing entries are left as they are
    pub fn add(&mut self, ctx: &PassContext<'_>) -> ManifestResult<DirState> {
        self.add_or_update(true, ctx)
    }

    /// Shared update pass. Saves the manifest only when something changed.
    ///
    /// When a file cannot be read the pass stops there, but entries recorded
    /// before it are still saved before the read error is returned. If the
    /// save fails, the in-memory entries are rolled back to what is on disk
    /// so a later pass records them again.
    pub fn add_or_update(
        &mut self,
        skip_existing: bool,
        ctx: &PassContext<'_>,
    ) -> ManifestResult<DirState> {
        let mut added = 0usize;
        let mut changed = 0usize;
        let mut interrupted = None;
        let persisted = self.files.clone();

        for (name, path) in self.list_files()? {
            if skip_existing && self.files.contains_key(&name) {
                continue;
            }

            debug!(path = %path.display(), "Updating file");

            let current = match ctx.checksum(&path) {
                Ok(sum) => sum,
                Err(e) => {
                    interrupted = Some(e);
                    break;
                }
            };

            let change = match self.files.get(&name) {
                None => Change::New,
                Some(recorded) if *recorded != current => Change::Changed(recorded.clone()),
                Some(_) => Change::Same,
            };

            match change {
                Change::New => {
                    debug!(path = %path.display(), "Captured");
                    self.files.insert(name, current);
                    added += 1;
                    ctx.report_new(path);
                }
                Change::Changed(previous) => {
                    debug!(
                        path = %path.display(),
                        from = %previous,
                        to = %current,
                        "Updated"
                    );
                    self.files.insert(name, current);
                    changed += 1;
                    ctx.report_updated(path);
                }
                Change::Same => ctx.report_verified(),
            }
        }

        if added + changed > 0 {
            if let Err(save_err) = self.save() {
                self.files = persisted;
                return match interrupted {
                    Some(read_err) => {
                        error!(
                            path = %self.path.display(),
                            error = %save_err,
                            "Could not save checksums recorded before read failure"
                        );
                        Err(read_err)
                    }
                    None => Err(save_err),
                };
            }
        }

        if let Some(e) = interrupted {
            return Err(e);
        }

        debug!(path = %self.path.display(), added, changed, "Done updating");

        Ok(if changed > 0 {
            DirState::Updated
        } else if added > 0 {
            DirState::Added
        } else {
            DirState::Unchanged
        })
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Manifests written with a nil map carry `"files":null`
fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}
