use itertools::Itertools;
use tracing::info;

use crate::model::LocatedToll;

const TOP_HIGHWAY_TYPES: usize = 10;

#[derive(Debug, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub with_highway_type: usize,
    pub with_name: usize,
    pub with_operator: usize,
    /// Most common highway types, descending by count.
    pub highway_types: Vec<(String, usize)>,
}

pub fn summarise(tolls: &[LocatedToll]) -> Stats {
    let records = || tolls.iter().map(|x| &x.record);

    let highway_types = records()
        .filter_map(|x| x.highway_type.clone())
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(TOP_HIGHWAY_TYPES)
        .collect();

    Stats {
        total: tolls.len(),
        with_highway_type: records().filter(|x| x.highway_type.is_some()).count(),
        with_name: records().filter(|x| x.name.is_some()).count(),
        with_operator: records().filter(|x| x.operator.is_some()).count(),
        highway_types,
    }
}

impl Stats {
    pub fn log(&self) {
        let total = self.total;
        info!("with highway type: {}/{total}", self.with_highway_type);
        info!("with name: {}/{total}", self.with_name);
        info!("with operator: {}/{total}", self.with_operator);

        if self.highway_types.is_empty() {
            info!("no highway types found");
        }
        for (highway, count) in &self.highway_types {
            info!(highway = %highway, count, "highway type");
        }
    }
}
