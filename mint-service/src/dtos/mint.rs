use crate::models::Creature;
use crate::services::minting::MintOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JSON body of a successful `POST /mint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    pub ok: bool,
    pub token_id: String,
    pub horse: Creature,
    /// `null` when storage is off or the write failed.
    pub asset_url: Option<String>,
    pub permalink: String,
}

impl From<MintOutcome> for MintResponse {
    fn from(outcome: MintOutcome) -> Self {
        Self {
            ok: true,
            token_id: outcome.token_id.to_string(),
            horse: outcome.creature,
            asset_url: outcome.asset_url,
            permalink: outcome.permalink,
        }
    }
}

/// Metadata document stored next to the asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetMetadata {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub attributes: Vec<MetadataAttribute>,
    /// Epoch seconds.
    pub created_at: i64,
    pub token_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataAttribute {
    pub trait_type: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(u8),
    Text(String),
}

impl MetadataAttribute {
    fn text(trait_type: &str, value: &str) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: AttributeValue::Text(value.to_string()),
        }
    }

    fn number(trait_type: &str, value: u8) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: AttributeValue::Number(value),
        }
    }
}

impl AssetMetadata {
    pub fn new(creature: &Creature, token_id: &Uuid, image: Option<String>, created_at: i64) -> Self {
        Self {
            name: creature.name.clone(),
            description: format!("{}な競走馬。「{}」", creature.temperament, creature.catchphrase),
            image,
            attributes: vec![
                MetadataAttribute::text("Temperament", &creature.temperament),
                MetadataAttribute::text("Color Scheme", &creature.color_scheme),
                MetadataAttribute::number("Speed", creature.speed),
                MetadataAttribute::number("Stamina", creature.stamina),
                MetadataAttribute::number("Skill", creature.skill),
            ],
            created_at,
            token_id: token_id.to_string(),
        }
    }
}
