//! Bootstrap configuration: which registers to seed on first start.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::OpenError;

const FALLBACK_FILE: &str = "registers.json";

/// One register to seed into an empty store.
///
/// The JSON keys keep the original configuration spelling (`namn`,
/// `jdbcURL`) so existing descriptor files stay valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDescriptor {
    #[serde(rename = "namn")]
    pub name: String,
    #[serde(rename = "jdbcURL")]
    pub source_url: String,
}

/// Load the bootstrap descriptors from `dir`.
///
/// A host-specific file `registers.<hostname>.json` wins over the plain
/// `registers.json`, so one shared configuration directory can serve
/// several machines. Neither file present is fatal.
pub fn load_descriptors(dir: &Path) -> Result<Vec<RegisterDescriptor>, OpenError> {
    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    let host_specific = format!("registers.{hostname}.json");

    for candidate in [&host_specific, FALLBACK_FILE] {
        let path = dir.join(candidate);
        if path.is_file() {
            info!(path = %path.display(), "loading bootstrap descriptors");
            return parse_descriptors(&path);
        }
    }

    Err(OpenError::MissingBootstrapResource {
        dir: dir.to_owned(),
        host_specific,
        fallback: FALLBACK_FILE.to_owned(),
    })
}

fn parse_descriptors(path: &Path) -> Result<Vec<RegisterDescriptor>, OpenError> {
    let file = std::fs::File::open(path).map_err(|source| OpenError::Config {
        path: path.to_owned(),
        source: serde_json::Error::io(source),
    })?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| OpenError::Config {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn descriptor_keys_keep_the_original_spelling() {
        let descriptor: RegisterDescriptor =
            serde_json::from_str(r#"{"namn": "R1", "jdbcURL": "jdbc:x"}"#).unwrap();
        assert_eq!(descriptor.name, "R1");
        assert_eq!(descriptor.source_url, "jdbc:x");
    }

    #[test]
    fn missing_descriptor_files_are_fatal() {
        let dir = tempdir().unwrap();
        let err = load_descriptors(dir.path()).unwrap_err();
        assert!(matches!(err, OpenError::MissingBootstrapResource { .. }));
    }

    #[test]
    fn falls_back_to_the_shared_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("registers.json"),
            r#"[{"namn": "R1", "jdbcURL": "jdbc:x"}]"#,
        )
        .unwrap();
        let descriptors = load_descriptors(dir.path()).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "R1");
    }

    #[test]
    fn host_specific_descriptor_wins() {
        let dir = tempdir().unwrap();
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        std::fs::write(
            dir.path().join("registers.json"),
            r#"[{"namn": "Shared", "jdbcURL": "jdbc:shared"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(format!("registers.{hostname}.json")),
            r#"[{"namn": "Local", "jdbcURL": "jdbc:local"}]"#,
        )
        .unwrap();
        let descriptors = load_descriptors(dir.path()).unwrap();
        assert_eq!(descriptors[0].name, "Local");
    }

    #[test]
    fn malformed_descriptor_is_a_config_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("registers.json"), "not json").unwrap();
        let err = load_descriptors(dir.path()).unwrap_err();
        assert!(matches!(err, OpenError::Config { .. }));
    }
}
