//! Program configuration read from a `KEY = value` text file.
//!
//! ```text
//! IMAGE_DIRECTORY = /usr/share/dicom-viewer/images
//! ORTHANC_SERVER = localhost 8042
//! HOUNSFIELD_PRESETS = Bone 300 2000 Lung -1200 -400
//! LUT_DIRECTORY = /usr/share/dicom-viewer/lut
//! ```
//!
//! Unknown keys and lines without `=` are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::range::Range;

/// Orthanc's default HTTP port.
pub const DEFAULT_ORTHANC_PORT: u16 = 8042;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrthancServer {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgramConfiguration {
    pub image_directory: Option<PathBuf>,
    pub orthanc_server: Option<OrthancServer>,
    /// Named windows offered next to the windows of a series.
    pub hounsfield_presets: BTreeMap<String, Range>,
    pub lut_directory: Option<PathBuf>,
}

impl ProgramConfiguration {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        debug!("Read configuration from {}", path.display());
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "IMAGE_DIRECTORY" => config.image_directory = Some(PathBuf::from(value)),
                "LUT_DIRECTORY" => config.lut_directory = Some(PathBuf::from(value)),
                "ORTHANC_SERVER" => config.orthanc_server = parse_server(value, number + 1),
                "HOUNSFIELD_PRESETS" => parse_presets(value, number + 1, &mut config.hounsfield_presets),
                other => debug!("Ignoring configuration key {other:?}"),
            }
        }

        config
    }

    /// The `*.lut` files of the LUT directory, sorted by path.
    pub fn lut_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let Some(directory) = &self.lut_directory else {
            return Ok(Vec::new());
        };
        let mut files: Vec<PathBuf> = fs::read_dir(directory)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.is_file() && path.extension().is_some_and(|extension| extension == "lut")
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

fn parse_server(value: &str, line: usize) -> Option<OrthancServer> {
    let mut words = value.split_whitespace();
    let host = words.next()?.to_string();
    let port = match words.next() {
        None => DEFAULT_ORTHANC_PORT,
        Some(port) => port.parse().unwrap_or_else(|_| {
            warn!("Line {line}: invalid Orthanc port {port:?}, using {DEFAULT_ORTHANC_PORT}");
            DEFAULT_ORTHANC_PORT
        }),
    };
    Some(OrthancServer { host, port })
}

fn parse_presets(value: &str, line: usize, presets: &mut BTreeMap<String, Range>) {
    let words: Vec<&str> = value.split_whitespace().collect();
    for triple in words.chunks(3) {
        let [name, min, max] = triple else {
            warn!("Line {line}: incomplete Hounsfield preset {triple:?}");
            continue;
        };
        match (min.parse::<f64>(), max.parse::<f64>()) {
            (Ok(min), Ok(max)) => {
                presets.insert(name.to_string(), Range::new(min, max));
            }
            _ => warn!("Line {line}: invalid bounds for Hounsfield preset {name:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;

    #[test]
    fn parses_all_keys() {
        let config = ProgramConfiguration::parse(
            "IMAGE_DIRECTORY = /opt/images\n\
             ORTHANC_SERVER =  pacs.local   4242 \n\
             HOUNSFIELD_PRESETS = Bone 300 2000 Lung -1200 -400\n\
             LUT_DIRECTORY=/opt/lut\n",
        );

        assert_eq!(config.image_directory, Some(PathBuf::from("/opt/images")));
        assert_eq!(config.lut_directory, Some(PathBuf::from("/opt/lut")));
        assert_eq!(
            config.orthanc_server,
            Some(OrthancServer { host: "pacs.local".into(), port: 4242 })
        );
        assert_eq!(
            config.hounsfield_presets.into_iter().collect::<Vec<_>>(),
            vec![
                ("Bone".to_string(), Range::new(300.0, 2000.0)),
                ("Lung".to_string(), Range::new(-1200.0, -400.0)),
            ]
        );
    }

    #[rstest]
    #[case("ORTHANC_SERVER = localhost", Some(("localhost", 8042)))]
    #[case("ORTHANC_SERVER = localhost port", Some(("localhost", 8042)))]
    #[case("ORTHANC_SERVER = ", None)]
    fn orthanc_port_defaults(#[case] line: &str, #[case] expected: Option<(&str, u16)>) {
        let config = ProgramConfiguration::parse(line);
        assert_eq!(
            config.orthanc_server,
            expected.map(|(host, port)| OrthancServer { host: host.into(), port })
        );
    }

    #[test]
    fn bad_lines_are_skipped() {
        let config = ProgramConfiguration::parse(
            "just words\n\
             \n\
             HOUNSFIELD_PRESETS = Soft 40 wide Brain 0 80 Dangling -5\n\
             HOUNSFIELD_PRESETS = Brain 20 60\n\
             COLOR = red\n",
        );
        assert_eq!(config.hounsfield_presets.len(), 1);
        assert_eq!(config.hounsfield_presets["Brain"], Range::new(20.0, 60.0));
        assert_eq!(config.image_directory, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ProgramConfiguration::from_file(dir.path().join("absent.conf"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn lists_lut_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["hot.lut", "bone.lut", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.lut")).unwrap();

        let config_path = dir.path().join("viewer.conf");
        std::fs::write(
            &config_path,
            format!("LUT_DIRECTORY = {}\n", dir.path().display()),
        )
        .unwrap();
        let config = ProgramConfiguration::from_file(&config_path).unwrap();

        assert_eq!(
            config.lut_files().unwrap(),
            vec![dir.path().join("bone.lut"), dir.path().join("hot.lut")]
        );
        assert!(ProgramConfiguration::default().lut_files().unwrap().is_empty());
    }
}
