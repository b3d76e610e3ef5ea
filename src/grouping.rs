//! Focus sequence discovery
//!
//! Files matching a pattern are filtered on their observation type and
//! gathered into groups sharing the same instrument configuration.

use crate::fits::Fits;
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum GroupingError {
    #[error("invalid file pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list files")]
    Glob(#[from] glob::GlobError),
    #[error("non UTF-8 path: {0:?}")]
    Path(PathBuf),
}
type Result<T> = std::result::Result<T, GroupingError>;

/// Header keywords read from the images
#[derive(Debug, Clone, PartialEq)]
pub struct Keywords {
    /// Focus mechanism position
    pub focus: String,
    /// Observation type
    pub obstype: String,
    /// Keywords defining an instrument configuration
    pub group: Vec<String>,
}
impl Default for Keywords {
    fn default() -> Self {
        Self {
            focus: "CAM_FOC".to_string(),
            obstype: "OBSTYPE".to_string(),
            group: [
                "CAM_TARG", "GRT_TARG", "FILTER", "FILTER2", "GRATING", "SLIT", "WAVMODE",
                "RDNOISE", "GAIN", "ROI",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Files sharing the same instrument configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageGroup {
    /// `(keyword, value)` pairs of the configuration
    pub configuration: Vec<(String, String)>,
    pub files: Vec<PathBuf>,
}
impl ImageGroup {
    pub fn len(&self) -> usize {
        self.files.len()
    }
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
impl fmt::Display for ImageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config: Vec<String> = self
            .configuration
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "[{}] ({} files)", config.join(", "), self.len())
    }
}

/// Files in `data_path` matching `pattern`, sorted by name
pub fn discover<P: AsRef<Path>>(data_path: P, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = data_path.as_ref().join(pattern);
    let full = full.to_str().ok_or_else(|| GroupingError::Path(full.clone()))?;
    let mut files = glob::glob(full)?.collect::<std::result::Result<Vec<PathBuf>, glob::GlobError>>()?;
    files.sort();
    Ok(files)
}

/// Groups the files of the given observation type by instrument configuration
///
/// Files with an unreadable header, another observation type or a missing
/// configuration keyword are skipped. Groups are sorted by configuration.
pub fn group_files(files: &[PathBuf], obstype: &str, keywords: &Keywords) -> Vec<ImageGroup> {
    let requested: Vec<&str> = std::iter::once(keywords.obstype.as_str())
        .chain(keywords.group.iter().map(String::as_str))
        .collect();
    let configurations: Vec<Option<(Vec<String>, PathBuf)>> = files
        .par_iter()
        .map(|file| {
            let header = Fits::read_header(file, &requested)
                .map_err(|e| log::warn!("skipping {:?}: {}", file, e))
                .ok()?;
            let file_obstype = header.get(&keywords.obstype);
            if file_obstype != Some(obstype) {
                log::debug!(
                    "skipping {:?}: {} is {:?}",
                    file,
                    keywords.obstype,
                    file_obstype
                );
                return None;
            }
            let values = keywords
                .group
                .iter()
                .map(|key| {
                    header.get(key).map(String::from).or_else(|| {
                        log::warn!("skipping {:?}: missing keyword {}", file, key);
                        None
                    })
                })
                .collect::<Option<Vec<String>>>()?;
            Some((values, file.clone()))
        })
        .collect();

    let mut groups: BTreeMap<Vec<String>, Vec<PathBuf>> = BTreeMap::new();
    for (values, file) in configurations.into_iter().flatten() {
        groups.entry(values).or_default().push(file);
    }
    groups
        .into_iter()
        .map(|(values, files)| ImageGroup {
            configuration: keywords.group.iter().cloned().zip(values).collect(),
            files,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keywords() {
        let keywords = Keywords::default();
        assert_eq!(keywords.focus, "CAM_FOC");
        assert_eq!(keywords.group.len(), 10);
        assert!(keywords.group.contains(&"WAVMODE".to_string()));
    }

    #[test]
    fn group_display() {
        let group = ImageGroup {
            configuration: vec![
                ("GRATING".to_string(), "400_SYZY".to_string()),
                ("SLIT".to_string(), "1.0_LONG_SLIT".to_string()),
            ],
            files: vec![PathBuf::from("a.fits")],
        };
        assert_eq!(
            group.to_string(),
            "[GRATING=400_SYZY, SLIT=1.0_LONG_SLIT] (1 files)"
        );
    }

    #[test]
    fn missing_directory_has_no_file() {
        let files = discover("/this/path/does/not/exist", "*.fits").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn bad_pattern() {
        assert!(matches!(
            discover(".", "[*.fits"),
            Err(GroupingError::Pattern(_))
        ));
    }
}
