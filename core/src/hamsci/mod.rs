//! HamSci Grape Doppler data: node catalog, local loading and response extraction.

pub mod loader;
pub mod nodes;
pub mod response;

pub use loader::{LoadReport, NodeDataLoader, NodeDataset, SkippedNode};
pub use nodes::{NodeCatalog, NodeMetadata};
pub use response::{ExtractionReport, ResponseExtractor, ResponseParameters};
