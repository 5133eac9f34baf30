use serde::{Deserialize, Serialize};
use std::fmt;

/// The visualization that last changed the selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    Graph,
    Timeline,
    Map,
    List,
    Search,
    /// Any other panel, identified by name
    External(String),
}

impl SelectionSource {
    /// Short name used in logs and the status bar
    pub fn name(&self) -> &str {
        match self {
            SelectionSource::Graph => "graph",
            SelectionSource::Timeline => "timeline",
            SelectionSource::Map => "map",
            SelectionSource::List => "list",
            SelectionSource::Search => "search",
            SelectionSource::External(name) => name,
        }
    }
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for SelectionSource {
    fn from(name: &str) -> Self {
        match name {
            "graph" => SelectionSource::Graph,
            "timeline" => SelectionSource::Timeline,
            "map" => SelectionSource::Map,
            "list" => SelectionSource::List,
            "search" => SelectionSource::Search,
            other => SelectionSource::External(other.to_string()),
        }
    }
}

/// The three categories of selectable items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    Entity,
    Event,
    Location,
}

impl SelectionKind {
    pub const ALL: [SelectionKind; 3] = [
        SelectionKind::Entity,
        SelectionKind::Event,
        SelectionKind::Location,
    ];
}
