//! JSON documents kept in the user's data directory.

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::{fs, io, path::Path};

/// Reads `path`, or returns the default value when the file does not exist yet.
pub fn load_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

/// Writes `value` next to `path` and renames it into place, creating parent
/// directories as needed.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let staged = path.with_extension("json.tmp");
    fs::write(&staged, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("failed to write {}", staged.display()))?;
    fs::rename(&staged, path).with_context(|| format!("failed to replace {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_reads_as_default_and_saves_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let empty: BTreeMap<String, u32> = load_or_default(&path).unwrap();
        assert!(empty.is_empty());

        let value = BTreeMap::from([(String::from("seen"), 3)]);
        save(&path, &value).unwrap();
        assert_eq!(load_or_default::<BTreeMap<String, u32>>(&path).unwrap(), value);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{").unwrap();
        assert!(load_or_default::<BTreeMap<String, u32>>(&path).is_err());
    }
}
