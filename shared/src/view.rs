use serde::{Deserialize, Serialize};

/// Column-oriented view of the displayed cities, one entry per marker.
/// All vectors are index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPayload {
    pub seq: u64,
    pub timestamp: String,
    pub region: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub name: Vec<String>,
    #[serde(flatten)]
    pub samples: SampleColumns,
}

/// Weather columns, published on their own after a refresh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleColumns {
    pub cloud: Vec<f64>,
    pub temp: Vec<f64>,
    pub humidity: Vec<f64>,
    pub pressure: Vec<f64>,
    pub color: Vec<String>,
}

impl SampleColumns {
    pub fn len(&self) -> usize {
        self.temp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temp.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewEvent {
    Snapshot(ViewPayload),
    Update {
        seq: u64,
        timestamp: String,
        region: String,
        #[serde(flatten)]
        samples: SampleColumns,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub index: usize,
    pub key: String,
    pub label: String,
    pub points: usize,
}

/// Region selector model: every region in selector order plus the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionsPayload {
    pub active: usize,
    pub regions: Vec<RegionSummary>,
}

/// A "region selected" event from the selector control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionSelection {
    Index { index: usize },
    Key { key: String },
}
