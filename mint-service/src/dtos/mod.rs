pub mod mint;

pub use mint::{AssetMetadata, MetadataAttribute, MintResponse};
