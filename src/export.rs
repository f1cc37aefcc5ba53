use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::model::LocatedToll;

pub const DEFAULT_CSV: &str = "data/toll_booths_overpass.csv";

/// Writes one row per toll, creating parent directories as needed.
pub fn write_csv(path: &Path, tolls: &[LocatedToll]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|x| !x.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    for toll in tolls {
        writer.serialize(&toll.record)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use tempfile::tempdir;

    use super::*;
    use crate::model::TollRecord;

    fn toll(osm_id: u64, name: Option<&str>, highway: Option<&str>) -> LocatedToll {
        LocatedToll::new(TollRecord {
            osm_id,
            name: name.map(str::to_string),
            operator: None,
            highway_type: highway.map(str::to_string),
            highway_name: None,
            highway_ref: highway.map(|_| "NH44".to_string()),
            lat: Some(10.0),
            lon: Some(20.5),
        })
        .unwrap()
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out/tolls.csv");

        write_csv(
            &path,
            &[toll(1, Some("Booth A"), Some("trunk")), toll(2, None, None)],
        )
        .unwrap();

        let contents = read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "osm_id,name,operator,highway_type,highway_name,highway_ref,lat,lon",
                "1,Booth A,,trunk,,NH44,10.0,20.5",
                "2,,,,,,10.0,20.5",
            ]
        );
    }

    #[test]
    fn rows_read_back_as_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tolls.csv");
        let tolls = vec![toll(7, Some("Toll, Plaza \"7\""), Some("motorway"))];

        write_csv(&path, &tolls).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<TollRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(records, vec![tolls[0].record.clone()]);
    }

    #[test]
    fn fails_when_path_is_a_directory() {
        let dir = tempdir().unwrap();
        assert!(write_csv(dir.path(), &[toll(1, None, None)]).is_err());
    }
}
