// src/regions.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::geometry::Polygon;
use crate::intervals::Interval;

/// Load a region file: a JSON object mapping region name to polygon
/// vertices, e.g. `{"stand_17": [[210, 80], [630, 80], ...]}`.
///
/// Every region is validated; a name with fewer than 3 vertices is an
/// error, not a degraded run.
pub fn load_regions(path: &Path) -> Result<BTreeMap<String, Polygon>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read region file {}", path.display()))?;

    let raw: BTreeMap<String, Vec<(f64, f64)>> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid region file {}", path.display()))?;

    if raw.is_empty() {
        bail!("region file {} defines no regions", path.display());
    }

    let mut regions = BTreeMap::new();
    for (name, vertices) in raw {
        let polygon =
            Polygon::new(vertices).with_context(|| format!("region '{name}'"))?;
        regions.insert(name, polygon);
    }

    Ok(regions)
}

/// Write the result file: region name mapped to its interval list,
/// each interval as a two-element `[start, end]` array.
pub fn write_result(path: &Path, result: &BTreeMap<String, Vec<Interval>>) -> Result<()> {
    let pairs: BTreeMap<&str, Vec<[usize; 2]>> = result
        .iter()
        .map(|(name, intervals)| {
            (
                name.as_str(),
                intervals.iter().map(|iv| iv.pair()).collect(),
            )
        })
        .collect();

    let json = serde_json::to_string(&pairs)?;
    fs::write(path, json)
        .with_context(|| format!("failed to write result to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(
            &path,
            r#"{"stand_a": [[0, 0], [0, 10], [10, 10], [10, 0]]}"#,
        )
        .unwrap();

        let regions = load_regions(&path).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(regions["stand_a"].contains_point(5.0, 5.0));
    }

    #[test]
    fn test_load_regions_rejects_degenerate_polygon() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(&path, r#"{"bad": [[0, 0], [1, 1]]}"#).unwrap();

        let err = load_regions(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad"));
    }

    #[test]
    fn test_load_regions_rejects_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(&path, "{}").unwrap();

        assert!(load_regions(&path).is_err());
    }

    #[test]
    fn test_write_result_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");

        let mut result = BTreeMap::new();
        result.insert(
            "stand_a".to_string(),
            vec![
                Interval { start: 1, end: 2 },
                Interval { start: 5, end: 5 },
            ],
        );
        write_result(&path, &result).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({"stand_a": [[1, 2], [5, 5]]}));
    }
}
