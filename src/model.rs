use std::collections::BTreeMap;

use geo::Point;
use serde::{Deserialize, Serialize};

pub type Tags = BTreeMap<String, String>;

/// Looks up a tag, treating an empty value the same as a missing one.
pub fn tag<'a>(tags: &'a Tags, key: &str) -> Option<&'a str> {
    tags.get(key).map(|x| x.as_str()).filter(|x| !x.is_empty())
}

#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Point(OsmPoint),
    Way(OsmWay),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OsmPoint {
    pub id: u64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tags: Tags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OsmWay {
    pub id: u64,
    pub nodes: Vec<u64>,
    pub tags: Tags,
}

/// A point tagged `barrier=toll_booth`.
#[derive(Clone, Debug, PartialEq)]
pub struct TollNode {
    pub id: u64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tags: Tags,
}

impl TollNode {
    pub fn from_point(point: OsmPoint) -> Option<Self> {
        if tag(&point.tags, "barrier") != Some("toll_booth") {
            return None;
        }

        Some(Self {
            id: point.id,
            lat: point.lat,
            lon: point.lon,
            tags: point.tags,
        })
    }

    pub fn name(&self) -> Option<&str> {
        tag(&self.tags, "name").or_else(|| tag(&self.tags, "ref"))
    }

    pub fn operator(&self) -> Option<&str> {
        tag(&self.tags, "operator")
    }
}

/// The attributes of a way carrying a `highway` classification.
#[derive(Clone, Debug, PartialEq)]
pub struct HighwayWay {
    pub highway: String,
    pub name: Option<String>,
    pub reference: Option<String>,
    pub toll: Option<String>,
    pub operator: Option<String>,
}

impl HighwayWay {
    pub fn from_tags(tags: &Tags) -> Option<Self> {
        let owned = |key| tag(tags, key).map(str::to_string);
        Some(Self {
            highway: owned("highway")?,
            name: owned("name"),
            reference: owned("ref"),
            toll: owned("toll"),
            operator: owned("operator"),
        })
    }

    /// `name`, falling back to `ref`.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.reference.as_deref())
    }
}

/// One reconciled toll booth. Field order is the CSV column order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TollRecord {
    pub osm_id: u64,
    pub name: Option<String>,
    pub operator: Option<String>,
    pub highway_type: Option<String>,
    pub highway_name: Option<String>,
    pub highway_ref: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl TollRecord {
    pub fn new(toll: &TollNode, highway: Option<&HighwayWay>) -> Self {
        // the booth's own tags win, the highway only fills gaps
        let name = toll
            .name()
            .or_else(|| highway.and_then(|x| x.display_name()));
        let operator = toll
            .operator()
            .or_else(|| highway.and_then(|x| x.operator.as_deref()));

        Self {
            osm_id: toll.id,
            name: name.map(str::to_string),
            operator: operator.map(str::to_string),
            highway_type: highway.map(|x| x.highway.clone()),
            highway_name: highway.and_then(|x| x.name.clone()),
            highway_ref: highway.and_then(|x| x.reference.clone()),
            lat: toll.lat,
            lon: toll.lon,
        }
    }

    pub fn point(&self) -> Option<Point> {
        Some(Point::new(self.lon?, self.lat?))
    }
}

/// A record with both coordinates present, ready to be persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatedToll {
    pub record: TollRecord,
    pub point: Point,
}

impl LocatedToll {
    pub fn new(record: TollRecord) -> Option<Self> {
        let point = record.point()?;
        Some(Self { record, point })
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn toll_node_requires_barrier_tag() {
        let point = OsmPoint {
            id: 1,
            lat: Some(1.0),
            lon: Some(2.0),
            tags: tags(&[("barrier", "gate")]),
        };
        assert_eq!(TollNode::from_point(point), None);
    }

    #[test]
    fn toll_node_name_falls_back_to_ref() {
        let toll = TollNode::from_point(OsmPoint {
            id: 1,
            lat: None,
            lon: None,
            tags: tags(&[("barrier", "toll_booth"), ("name", ""), ("ref", "TP-7")]),
        })
        .unwrap();
        assert_eq!(toll.name(), Some("TP-7"));
        assert_eq!(toll.operator(), None);
    }

    #[test]
    fn highway_requires_classification() {
        assert_eq!(HighwayWay::from_tags(&tags(&[("name", "MG Road")])), None);
        assert_eq!(HighwayWay::from_tags(&tags(&[("highway", "")])), None);

        let way = HighwayWay::from_tags(&tags(&[("highway", "motorway"), ("ref", "NE1")])).unwrap();
        assert_eq!(way.display_name(), Some("NE1"));
        assert_eq!(way.name, None);
    }

    #[test]
    fn located_toll_needs_both_coordinates() {
        let mut record = TollRecord {
            osm_id: 5,
            name: None,
            operator: None,
            highway_type: None,
            highway_name: None,
            highway_ref: None,
            lat: Some(12.5),
            lon: None,
        };
        assert_eq!(LocatedToll::new(record.clone()), None);

        record.lon = Some(77.25);
        let located = LocatedToll::new(record).unwrap();
        assert_eq!(located.lat(), 12.5);
        assert_eq!(located.lon(), 77.25);
    }
}
