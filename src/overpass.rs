use std::{fs::read_to_string, io::Read, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use ureq::{Agent, AgentBuilder};

use crate::model::{Element, OsmPoint, OsmWay, Tags};

pub const DEFAULT_URL: &str = "https://overpass-api.de/api/interpreter";

pub fn agent() -> Agent {
    AgentBuilder::new()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
}

/// Toll booths inside the named area plus every highway way passing through one.
pub fn toll_query(area: &str, timeout: u32) -> String {
    let area = area.replace('\\', "\\\\").replace('"', "\\\"");
    let body = include_str!("tolls.overpassql").replace("{area}", &area);
    format!("[out:json][timeout:{timeout}];\n{body}")
}

/// Posts the query and returns the raw response body.
pub fn fetch(agent: &Agent, url: &str, query: &str) -> Result<String> {
    let response = agent
        .post(url)
        .send_form(&[("data", query)])
        .with_context(|| format!("Overpass request to {url} failed"))?;

    // into_string() caps the body at 10MB, a country-wide answer can be larger
    let mut body = String::new();
    response
        .into_reader()
        .read_to_string(&mut body)
        .context("Failed to read Overpass response")?;
    Ok(body)
}

pub fn parse(body: &str) -> Result<Vec<Element>> {
    let response: OverpassResponse =
        serde_json::from_str(body).context("Failed to decode Overpass response")?;

    Ok(response
        .elements
        .into_iter()
        .filter_map(|x| x.simplify())
        .collect())
}

/// Loads a response previously saved with `--save-raw`.
pub fn read(path: &Path) -> Result<Vec<Element>> {
    let body =
        read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&body)
}

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<RawElement>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawElement {
    Node {
        id: u64,
        lat: Option<f64>,
        lon: Option<f64>,
        #[serde(default)]
        tags: Tags,
    },
    Way {
        id: u64,
        #[serde(default)]
        nodes: Vec<u64>,
        #[serde(default)]
        tags: Tags,
    },
    // relations, areas
    #[serde(other)]
    Other,
}

impl RawElement {
    fn simplify(self) -> Option<Element> {
        match self {
            Self::Node { id, lat, lon, tags } => Some(Element::Point(OsmPoint { id, lat, lon, tags })),
            Self::Way { id, nodes, tags } => Some(Element::Way(OsmWay { id, nodes, tags })),
            Self::Other => None,
        }
    }
}
