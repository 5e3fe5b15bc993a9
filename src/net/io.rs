//! I/O 支持：以 JSON / RON 描述的网定义与 [`Net`] 之间的转换.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::core::{Net, NetError};
use crate::net::structure::{ArcMap, Weight};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron syntax error: {0}")]
    RonSpanned(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid net definition: {0}")]
    Net(#[from] NetError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    pub name: String,
    #[serde(default)]
    pub input: IndexMap<String, Weight>,
    #[serde(default)]
    pub output: IndexMap<String, Weight>,
}

/// 外部可编辑的网描述：库所列表、初始标识与迁移弧权。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDefinition {
    #[serde(default = "default_net_name")]
    pub name: String,
    pub places: Vec<String>,
    #[serde(default)]
    pub initial_marking: IndexMap<String, u64>,
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

fn default_net_name() -> String {
    "PetriNet".to_string()
}

impl NetDefinition {
    /// Replays the definition through the validating [`Net`] constructors.
    pub fn build(&self) -> Result<Net, NetError> {
        let mut net = Net::new(self.name.clone());
        net.add_places(self.places.iter().cloned())?;
        net.set_initial_marking(
            self.initial_marking
                .iter()
                .map(|(place, count)| (place.as_str(), *count)),
        )?;
        for transition in &self.transitions {
            net.add_transition(
                transition.name.clone(),
                transition.input.iter().map(|(p, w)| (p.as_str(), *w)),
                transition.output.iter().map(|(p, w)| (p.as_str(), *w)),
            )?;
        }
        Ok(net)
    }
}

impl Net {
    pub fn to_definition(&self) -> NetDefinition {
        let places = self.places();
        let initial = self.initial_marking();
        let named = |arcs: &ArcMap| {
            arcs.iter()
                .map(|(place, weight)| (places[*place].name.clone(), *weight))
                .collect::<IndexMap<_, _>>()
        };
        NetDefinition {
            name: self.name().to_string(),
            places: places.iter().map(|place| place.name.clone()).collect(),
            initial_marking: initial
                .iter()
                .filter_map(|(place, tokens)| {
                    tokens
                        .finite()
                        .filter(|count| *count > 0)
                        .map(|count| (places[place].name.clone(), count))
                })
                .collect(),
            transitions: self
                .transitions()
                .iter()
                .map(|transition| TransitionDefinition {
                    name: transition.name.clone(),
                    input: named(transition.input_arcs()),
                    output: named(transition.output_arcs()),
                })
                .collect(),
        }
    }
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn to_ron_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// 按扩展名选择格式（`.ron` 为 RON，其余按 JSON 解析），并构造网。
pub fn load_net<P: AsRef<Path>>(path: P) -> Result<Net, IoError> {
    let path = path.as_ref();
    let content = read_to_string(path)?;
    let definition: NetDefinition = match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => from_ron_str(&content)?,
        _ => from_json_str(&content)?,
    };
    Ok(definition.build()?)
}
