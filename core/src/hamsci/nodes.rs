use crate::prelude::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Station identity for one Grape node, as listed in the node metadata file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub node_id: String,
    pub callsign: Option<String>,
    pub grid_square: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation_m: Option<f64>,
    pub radio: Option<String>,
    pub antenna: Option<String>,
}

impl NodeMetadata {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }
}

/// Known nodes keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct NodeCatalog {
    nodes: BTreeMap<String, NodeMetadata>,
}

impl NodeCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item = NodeMetadata>) -> Self {
        Self {
            nodes: entries
                .into_iter()
                .map(|meta| (meta.node_id.clone(), meta))
                .collect(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|e| PipelineError::io(path_ref, e))?;
        Self::parse(&contents).map_err(|reason| {
            PipelineError::InvalidInput(format!("node list {}: {}", path_ref.display(), reason))
        })
    }

    /// Parses a comma-separated table with a header row naming its columns.
    /// Only `node_id` is mandatory; unknown columns are ignored.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let mut lines = contents
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (_, header) = lines.next().ok_or("empty node list")?;
        let columns: HashMap<String, usize> = header
            .split(',')
            .enumerate()
            .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
            .collect();
        let id_column = *columns.get("node_id").ok_or("missing node_id column")?;

        let mut nodes = BTreeMap::new();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let text = |name: &str| {
                columns
                    .get(name)
                    .and_then(|&i| fields.get(i))
                    .filter(|value| !value.is_empty())
                    .map(|value| value.to_string())
            };
            let number = |name: &str| -> Result<Option<f64>, String> {
                text(name)
                    .map(|value| {
                        value
                            .parse::<f64>()
                            .map_err(|_| format!("line {}: {} is not a number: {:?}", line_no, name, value))
                    })
                    .transpose()
            };

            let node_id = fields
                .get(id_column)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| format!("line {}: empty node_id", line_no))?
                .to_string();
            let meta = NodeMetadata {
                node_id: node_id.clone(),
                callsign: text("callsign"),
                grid_square: text("grid_square"),
                latitude: number("latitude")?,
                longitude: number("longitude")?,
                elevation_m: number("elevation_m")?,
                radio: text("radio"),
                antenna: text("antenna"),
            };
            nodes.insert(node_id, meta);
        }
        Ok(Self { nodes })
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeMetadata> {
        self.nodes.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE_LIST: &str = "\
# Grape node list
node_id,callsign,grid_square,latitude,longitude,elevation_m,radio
N0000001,KD2UHN,FN21ek,41.2, -74.4,150,Grape1
N0000002,,EM38ww,38.9,-92.3,,
";

    #[test]
    fn parses_header_driven_columns() {
        let catalog = NodeCatalog::parse(NODE_LIST).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = catalog.get("N0000001").unwrap();
        assert_eq!(first.callsign.as_deref(), Some("KD2UHN"));
        assert_eq!(first.longitude, Some(-74.4));
        assert_eq!(first.antenna, None);

        let second = catalog.get("N0000002").unwrap();
        assert_eq!(second.callsign, None);
        assert_eq!(second.elevation_m, None);
    }

    #[test]
    fn rejects_missing_id_column_and_bad_numbers() {
        assert!(NodeCatalog::parse("callsign,latitude\nX,1\n").is_err());
        let err = NodeCatalog::parse("node_id,latitude\nN1,north\n").unwrap_err();
        assert!(err.contains("line 2"));
    }
}
