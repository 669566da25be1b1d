use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single model descriptor (OpenAI `/v1/models` format).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelInfo {
    /// Model identifier string.
    pub id: String,
    /// Always `"model"`.
    pub object: String,
    /// Owner of the model.
    pub owned_by: String,
}

/// Response body for `GET /v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelListResponse {
    /// Always `"list"`.
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelListResponse {
    pub fn single(model: &str) -> Self {
        Self {
            object: "list".into(),
            data: vec![ModelInfo {
                id: model.to_owned(),
                object: "model".into(),
                owned_by: "google".into(),
            }],
        }
    }
}
