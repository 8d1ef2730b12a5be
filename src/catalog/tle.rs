use chrono::{DateTime, Utc};

use crate::catalog::error::CatalogError;
use crate::orbit::{ClassicalElements, OrbitalElementSet, PropagationModel};

/// Splits multi-satellite TLE text into `(name, line1, line2)` triples.
/// Both 2-line and 3-line layouts are accepted; stray lines are skipped.
pub fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            let name = lines[i].trim_start_matches("0 ").to_string();
            result.push((Some(name), lines[i + 1].to_string(), lines[i + 2].to_string()));
            i += 3;
        } else {
            i += 1;
        }
    }
    result
}

/// Constellation tag from the object name, falling back to `hint`, then `other`.
pub fn infer_constellation(name: &str, hint: Option<&str>) -> String {
    let upper = name.to_ascii_uppercase();
    if upper.contains("STARLINK") {
        "starlink".into()
    } else if upper.contains("ONEWEB") {
        "oneweb".into()
    } else {
        hint.unwrap_or("other").to_string()
    }
}

/// Converts one TLE into an SGP4-propagated element set.
pub fn element_set_from_tle(
    name: Option<String>,
    line1: &str,
    line2: &str,
    constellation_hint: Option<&str>,
) -> Result<OrbitalElementSet, CatalogError> {
    let label = name.clone().unwrap_or_else(|| line1.chars().take(8).collect());
    let elements = sgp4::Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
        .map_err(|e| CatalogError::InvalidTle {
            name: label.clone(),
            message: e.to_string(),
        })?;
    if !(elements.mean_motion > 0.0) {
        return Err(CatalogError::InvalidTle {
            name: label,
            message: format!("non-positive mean motion {}", elements.mean_motion),
        });
    }

    let id = name.unwrap_or_else(|| format!("NORAD {}", elements.norad_id));
    Ok(OrbitalElementSet {
        constellation: infer_constellation(&id, constellation_hint),
        epoch: DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc),
        elements: ClassicalElements {
            semi_major_axis_km: ClassicalElements::semi_major_axis_from_rev_day(
                elements.mean_motion,
            ),
            eccentricity: elements.eccentricity,
            inclination_deg: elements.inclination,
            raan_deg: elements.right_ascension,
            arg_perigee_deg: elements.argument_of_perigee,
            mean_anomaly_deg: elements.mean_anomaly,
        },
        drag_term: elements.drag_term,
        model: PropagationModel::Sgp4,
        id,
    })
}
