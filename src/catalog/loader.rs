use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::catalog::error::CatalogError;
use crate::catalog::tle::{element_set_from_tle, parse_multi_tle};
use crate::orbit::OrbitalElementSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    pub source: String,
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct CatalogBatch {
    pub sets: Vec<OrbitalElementSet>,
    pub rejected: Vec<RejectedRecord>,
}

impl CatalogBatch {
    fn extend(&mut self, other: CatalogBatch) {
        self.sets.extend(other.sets);
        self.rejected.extend(other.rejected);
    }

    /// Latest element epoch, the default start of the sampling grid.
    pub fn latest_epoch(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.sets.iter().map(|s| s.epoch).max()
    }

    /// Drops later records that reuse an identifier.
    fn dedup(&mut self) {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(self.sets.len());
        for (index, set) in std::mem::take(&mut self.sets).into_iter().enumerate() {
            if seen.insert(set.id.clone()) {
                kept.push(set);
            } else {
                self.rejected.push(RejectedRecord {
                    source: "catalog".into(),
                    index,
                    id: Some(set.id),
                    reason: "duplicate identifier".into(),
                });
            }
        }
        self.sets = kept;
    }
}

/// Loads a catalog file, or every catalog file in a directory.
pub fn load_catalog(path: &Path) -> Result<CatalogBatch, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::NotFound(path.display().to_string()));
    }

    let mut batch = CatalogBatch::default();
    if path.is_dir() {
        let mut files: Vec<_> = fs::read_dir(path)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .filter(|p| p.is_file() && catalog_kind(p).is_some())
            .collect();
        files.sort();
        for file in files {
            match load_file(&file) {
                Ok(loaded) => batch.extend(loaded),
                Err(e) => log::warn!("Failed to load catalog file {}: {}", file.display(), e),
            }
        }
    } else {
        batch = load_file(path)?;
    }
    batch.dedup();

    log::info!(
        "Loaded {} element sets ({} rejected)",
        batch.sets.len(),
        batch.rejected.len()
    );
    Ok(batch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CatalogKind {
    Tle,
    Structured,
}

fn catalog_kind(path: &Path) -> Option<CatalogKind> {
    match path.extension()?.to_str()? {
        "tle" | "txt" => Some(CatalogKind::Tle),
        "yaml" | "yml" | "json" => Some(CatalogKind::Structured),
        _ => None,
    }
}

fn load_file(path: &Path) -> Result<CatalogBatch, CatalogError> {
    let content = fs::read_to_string(path)?;
    let source = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    match catalog_kind(path) {
        Some(CatalogKind::Tle) => Ok(parse_tle_catalog(&content, &source)),
        _ => parse_structured_catalog(&content, &source),
    }
}

/// TLE text; the file stem hints the constellation of unnamed objects.
pub fn parse_tle_catalog(content: &str, source: &str) -> CatalogBatch {
    let hint = source.split('.').next().filter(|s| !s.is_empty());
    let mut batch = CatalogBatch::default();
    for (index, (name, line1, line2)) in parse_multi_tle(content).into_iter().enumerate() {
        match element_set_from_tle(name.clone(), &line1, &line2, hint) {
            Ok(set) => batch.sets.push(set),
            Err(e) => batch.rejected.push(RejectedRecord {
                source: source.to_string(),
                index,
                id: name,
                reason: e.to_string(),
            }),
        }
    }
    batch
}

/// YAML or JSON element records.
pub fn parse_structured_catalog(content: &str, source: &str) -> Result<CatalogBatch, CatalogError> {
    let root: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| CatalogError::Parse {
            file: source.to_string(),
            message: e.to_string(),
        })?;
    let records = match root {
        serde_yaml::Value::Sequence(records) => records,
        serde_yaml::Value::Mapping(mut map) => match map.remove("satellites") {
            Some(serde_yaml::Value::Sequence(records)) => records,
            _ => {
                return Err(CatalogError::Parse {
                    file: source.to_string(),
                    message: "expected a list of records or a `satellites` list".into(),
                })
            }
        },
        _ => {
            return Err(CatalogError::Parse {
                file: source.to_string(),
                message: "expected a list of records".into(),
            })
        }
    };

    let mut batch = CatalogBatch::default();
    for (index, record) in records.into_iter().enumerate() {
        let id = record
            .get("id")
            .or_else(|| record.get("name"))
            .and_then(|v| v.as_str())
            .map(String::from);
        match parse_record(record) {
            Ok(set) => batch.sets.push(set),
            Err(reason) => {
                log::warn!("Rejecting record {} of {}: {}", index, source, reason);
                batch.rejected.push(RejectedRecord {
                    source: source.to_string(),
                    index,
                    id,
                    reason,
                })
            }
        }
    }
    Ok(batch)
}

fn parse_record(record: serde_yaml::Value) -> Result<OrbitalElementSet, String> {
    if let (Some(line1), Some(line2)) = (
        record.get("line1").and_then(|v| v.as_str()),
        record.get("line2").and_then(|v| v.as_str()),
    ) {
        let name = record.get("name").and_then(|v| v.as_str()).map(String::from);
        let hint = record.get("constellation").and_then(|v| v.as_str());
        return element_set_from_tle(name, line1, line2, hint).map_err(|e| e.to_string());
    }
    let set: OrbitalElementSet = serde_yaml::from_value(record).map_err(|e| e.to_string())?;
    set.validate().map_err(|e| e.to_string())?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECORDS: &str = r#"
satellites:
  - id: STARLINK-1
    constellation: starlink
    epoch: 2025-09-01T00:00:00Z
    semi_major_axis_km: 6928.137
    eccentricity: 0.0001
    inclination_deg: 53.0
    raan_deg: 10.0
    arg_perigee_deg: 0.0
    mean_anomaly_deg: 0.0
  - id: NO-EPOCH
    constellation: starlink
    semi_major_axis_km: 6928.137
    eccentricity: 0.0001
    inclination_deg: 53.0
    raan_deg: 10.0
    arg_perigee_deg: 0.0
    mean_anomaly_deg: 0.0
  - id: NOT-A-NUMBER
    constellation: starlink
    epoch: 2025-09-01T00:00:00Z
    semi_major_axis_km: lots
    eccentricity: 0.0001
    inclination_deg: 53.0
    raan_deg: 10.0
    arg_perigee_deg: 0.0
    mean_anomaly_deg: 0.0
  - id: HYPERBOLIC
    constellation: oneweb
    epoch: 2025-09-01T00:00:00Z
    semi_major_axis_km: 7578.137
    eccentricity: 1.3
    inclination_deg: 87.9
    raan_deg: 0.0
    arg_perigee_deg: 0.0
    mean_anomaly_deg: 0.0
  - id: ONEWEB-1
    constellation: oneweb
    epoch: 2025-09-01T06:00:00Z
    semi_major_axis_km: 7578.137
    eccentricity: 0.0002
    inclination_deg: 87.9
    raan_deg: 0.0
    arg_perigee_deg: 0.0
    mean_anomaly_deg: 0.0
    model: two_body
"#;

    #[test]
    fn malformed_records_do_not_abort_the_batch() {
        let batch = parse_structured_catalog(RECORDS, "test.yaml").unwrap();
        let ids: Vec<_> = batch.sets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["STARLINK-1", "ONEWEB-1"]);
        let rejected: Vec<_> = batch
            .rejected
            .iter()
            .map(|r| (r.index, r.id.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(rejected, vec![(1, "NO-EPOCH"), (2, "NOT-A-NUMBER"), (3, "HYPERBOLIC")]);
        assert!(batch.rejected[0].reason.contains("epoch"));
        assert_eq!(batch.sets[1].model, crate::orbit::PropagationModel::TwoBody);
        assert_eq!(
            batch.latest_epoch().unwrap().to_rfc3339(),
            "2025-09-01T06:00:00+00:00"
        );
    }

    #[test]
    fn json_list_is_accepted() {
        let json = r#"[{"id": "S", "constellation": "starlink", "epoch": "2025-09-01T00:00:00Z",
            "semi_major_axis_km": 6928.0, "eccentricity": 0.0, "inclination_deg": 53.0,
            "raan_deg": 0.0, "arg_perigee_deg": 0.0, "mean_anomaly_deg": 0.0}]"#;
        let batch = parse_structured_catalog(json, "test.json").unwrap();
        assert_eq!(batch.sets.len(), 1);
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn scalar_root_is_a_parse_error() {
        assert!(matches!(
            parse_structured_catalog("42", "x.yaml"),
            Err(CatalogError::Parse { .. })
        ));
    }

    #[test]
    fn directory_load_merges_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let mut yaml = fs::File::create(dir.path().join("a.yaml")).unwrap();
        yaml.write_all(RECORDS.as_bytes()).unwrap();
        let mut dup = fs::File::create(dir.path().join("b.yml")).unwrap();
        dup.write_all(RECORDS.as_bytes()).unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let batch = load_catalog(dir.path()).unwrap();
        assert_eq!(batch.sets.len(), 2);
        let duplicates = batch
            .rejected
            .iter()
            .filter(|r| r.reason == "duplicate identifier")
            .count();
        assert_eq!(duplicates, 2);
    }

    #[test]
    fn missing_path_is_reported() {
        let err = load_catalog(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }
}
