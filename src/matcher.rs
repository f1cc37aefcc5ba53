use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::model::{Element, HighwayWay, TollNode, TollRecord};

pub struct Matched {
    pub records: Vec<TollRecord>,
    /// Toll nodes that were found on a highway way.
    pub matched: usize,
}

impl Matched {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn coverage(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.matched as f64 / self.records.len() as f64
        }
    }
}

/// Pairs every toll booth with the highway way it lies on.
///
/// Elements are taken in response order. A toll node shared by several
/// highway ways goes to the first of them in that order. Elements repeated
/// under the same id replace the earlier copy without moving it.
pub fn match_tolls(elements: impl IntoIterator<Item = Element>) -> Matched {
    let mut tolls: IndexMap<u64, TollNode> = IndexMap::new();
    let mut highways: IndexMap<u64, HighwayWay> = IndexMap::new();
    let mut way_nodes: IndexMap<u64, Vec<u64>> = IndexMap::new();

    for element in elements {
        match element {
            Element::Point(point) => {
                if let Some(toll) = TollNode::from_point(point) {
                    tolls.insert(toll.id, toll);
                }
            }
            Element::Way(way) => {
                if let Some(highway) = HighwayWay::from_tags(&way.tags) {
                    highways.insert(way.id, highway);
                    way_nodes.insert(way.id, way.nodes);
                }
            }
        }
    }

    // toll node -> first highway way containing it
    let mut owners: HashMap<u64, u64> = HashMap::new();
    for (way, nodes) in &way_nodes {
        for node in nodes {
            if tolls.contains_key(node) {
                owners.entry(*node).or_insert(*way);
            }
        }
    }

    let mut matched = 0;
    let records = tolls
        .values()
        .map(|toll| {
            let owner = owners.get(&toll.id);
            let highway = owner.and_then(|x| highways.get(x));
            if let (Some(way), Some(highway)) = (owner, highway) {
                debug!(
                    node = toll.id,
                    way,
                    highway = %highway.highway,
                    toll = ?highway.toll,
                    "matched"
                );
                matched += 1;
            }
            TollRecord::new(toll, highway)
        })
        .collect();

    Matched { records, matched }
}
