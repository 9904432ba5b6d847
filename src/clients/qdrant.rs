// Qdrant-backed vector index
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, CreateCollectionBuilder, Distance, PointId, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::VectorIndex;
use crate::errors::{RagError, Result};
use crate::types::{Passage, Scalar, ScoredPassage};

const PASSAGE_ID_KEY: &str = "passage_id";
const TEXT_KEY: &str = "text";
const SOURCE_KEY: &str = "source_reference";

/// Upsert batch size
const BATCH_SIZE: usize = 100;

/// Vector index stored in a Qdrant collection (cosine distance)
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimensions: u64,
}

impl QdrantIndex {
    /// Connect and make sure the collection exists
    pub async fn connect(url: &str, collection: &str, dimensions: usize, timeout: Duration) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::IndexUnavailable(format!("Failed to create Qdrant client: {}", e)))?;

        let index = Self {
            client,
            collection: collection.to_string(),
            dimensions: dimensions as u64,
        };
        index.ensure_collection().await?;
        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(unavailable)?;

        if !exists {
            info!(collection = %self.collection, dimensions = self.dimensions, "creating qdrant collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(self.collection.as_str())
                        .vectors_config(VectorParamsBuilder::new(self.dimensions, Distance::Cosine)),
                )
                .await
                .map_err(unavailable)?;
        }
        Ok(())
    }
}

fn unavailable(err: qdrant_client::QdrantError) -> RagError {
    RagError::IndexUnavailable(err.to_string())
}

/// Stable point id for an arbitrary passage id
pub fn point_uuid(passage_id: &str) -> Uuid {
    Uuid::parse_str(passage_id).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, passage_id.as_bytes()))
}

fn passage_payload(passage: &Passage) -> JsonValue {
    let mut payload = serde_json::Map::new();
    for (key, value) in &passage.metadata {
        payload.insert(key.clone(), json!(value));
    }
    payload.insert(PASSAGE_ID_KEY.to_string(), json!(passage.id));
    payload.insert(TEXT_KEY.to_string(), json!(passage.text));
    payload.insert(SOURCE_KEY.to_string(), json!(passage.source_reference));
    JsonValue::Object(payload)
}

fn payload_scalar(value: &QdrantValue) -> Option<Scalar> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(Scalar::Text(s.clone())),
        Kind::IntegerValue(i) => Some(Scalar::Int(*i)),
        Kind::DoubleValue(d) => Some(Scalar::Float(*d)),
        Kind::BoolValue(b) => Some(Scalar::Bool(*b)),
        _ => None,
    }
}

fn payload_string(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    match payload.get(key).and_then(payload_scalar) {
        Some(Scalar::Text(s)) => Some(s),
        _ => None,
    }
}

fn point_id_to_string(id: &Option<PointId>) -> String {
    match id.as_ref().and_then(|p| p.point_id_options.as_ref()) {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u.clone(),
        None => String::new(),
    }
}

fn scored_point_to_passage(point: ScoredPoint) -> ScoredPassage {
    let id = payload_string(&point.payload, PASSAGE_ID_KEY).unwrap_or_else(|| point_id_to_string(&point.id));
    let text = payload_string(&point.payload, TEXT_KEY).unwrap_or_default();
    let source_reference = payload_string(&point.payload, SOURCE_KEY).unwrap_or_default();

    let metadata: BTreeMap<String, Scalar> = point
        .payload
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), PASSAGE_ID_KEY | TEXT_KEY | SOURCE_KEY))
        .filter_map(|(key, value)| payload_scalar(value).map(|s| (key.clone(), s)))
        .collect();

    ScoredPassage {
        passage: Passage {
            id,
            text,
            source_reference,
            embedding: Vec::new(),
            metadata,
        },
        score: point.score,
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredPassage>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(self.collection.as_str(), vector.to_vec(), limit as u64).with_payload(true),
            )
            .await
            .map_err(unavailable)?;

        debug!(collection = %self.collection, hits = response.result.len(), "qdrant search");
        Ok(response.result.into_iter().map(scored_point_to_passage).collect())
    }

    async fn upsert(&self, passages: Vec<Passage>) -> Result<()> {
        for batch in passages.chunks(BATCH_SIZE) {
            let mut points = Vec::with_capacity(batch.len());
            for passage in batch {
                if passage.embedding.len() as u64 != self.dimensions {
                    return Err(RagError::EmbeddingDimension {
                        expected: self.dimensions as usize,
                        actual: passage.embedding.len(),
                    });
                }
                let payload = Payload::try_from(passage_payload(passage)).map_err(unavailable)?;
                points.push(PointStruct::new(
                    point_uuid(&passage.id).to_string(),
                    passage.embedding.clone(),
                    payload,
                ));
            }

            self.client
                .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points).wait(true))
                .await
                .map_err(unavailable)?;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.health_check().await.is_ok())
    }
}
