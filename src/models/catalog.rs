use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::ModelsError;
use crate::constants::MODEL_CATALOG_TTL;

/// Per-token prices as reported by the endpoint (decimal strings).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub completion: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub input_modalities: Vec<String>,
    pub pricing: Option<ModelPricing>,
}

impl ModelInfo {
    #[inline]
    pub fn supports_images(&self) -> bool {
        self.input_modalities.iter().any(|m| m == "image")
    }
}

type ModelMap = Arc<HashMap<String, ModelInfo>>;

/// Model list fetched on demand and memoised for [`MODEL_CATALOG_TTL`].
pub struct ModelCatalog {
    client: reqwest::Client,
    url: String,
    models: Cache<String, ModelMap>,
}

impl std::fmt::Debug for ModelCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCatalog")
            .field("url", &self.url)
            .field("cached", &self.models.contains_key(&self.url))
            .finish()
    }
}

impl ModelCatalog {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_ttl(reqwest::Client::new(), url, MODEL_CATALOG_TTL)
    }

    pub fn with_ttl(client: reqwest::Client, url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            models: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Installs a model list without fetching, e.g. for offline use.
    pub fn seed(&self, models: Vec<ModelInfo>) {
        self.models.insert(self.url.clone(), Arc::new(index(models)));
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// All known models, fetching when the memoised list is missing or expired.
    pub async fn models(&self) -> Result<ModelMap, ModelsError> {
        if let Some(models) = self.models.get(&self.url) {
            return Ok(models);
        }
        let models = Arc::new(index(self.fetch().await?));
        self.models.insert(self.url.clone(), Arc::clone(&models));
        Ok(models)
    }

    pub async fn get(&self, model_id: &str) -> Option<ModelInfo> {
        match self.models().await {
            Ok(models) => models.get(model_id).cloned(),
            Err(e) => {
                warn!(model_id, error = %e, "model catalog unavailable");
                None
            }
        }
    }

    /// `true` only when the model is known to accept image input.
    pub async fn supports_images(&self, model_id: &str) -> bool {
        self.get(model_id)
            .await
            .is_some_and(|model| model.supports_images())
    }

    async fn fetch(&self) -> Result<Vec<ModelInfo>, ModelsError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ModelsError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelsError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ModelsError::Request(e.to_string()))?;
        let models = parse_models(&body)?;
        debug!(count = models.len(), url = %self.url, "model list fetched");
        Ok(models)
    }
}

fn index(models: Vec<ModelInfo>) -> HashMap<String, ModelInfo> {
    models.into_iter().map(|m| (m.id.clone(), m)).collect()
}

/// Parses `{data:{models:[..]}}` or `{data:[..]}`.
///
/// Each model is identified by `slug`, falling back to `id`; pricing is read
/// from `pricing` or `endpoint.pricing`. Entries without an identifier are
/// skipped.
pub fn parse_models(body: &str) -> Result<Vec<ModelInfo>, ModelsError> {
    let root: Value =
        serde_json::from_str(body).map_err(|e| ModelsError::Malformed(e.to_string()))?;
    let data = root
        .get("data")
        .ok_or_else(|| ModelsError::Malformed("missing `data`".to_string()))?;
    let list = data
        .get("models")
        .unwrap_or(data)
        .as_array()
        .ok_or_else(|| ModelsError::Malformed("`data` holds no model array".to_string()))?;

    Ok(list.iter().filter_map(parse_model).collect())
}

fn parse_model(raw: &Value) -> Option<ModelInfo> {
    let id = raw
        .get("slug")
        .or_else(|| raw.get("id"))
        .and_then(Value::as_str)?
        .to_string();
    let input_modalities = raw
        .get("input_modalities")
        .and_then(Value::as_array)
        .map(|mods| {
            mods.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let pricing = raw
        .get("pricing")
        .or_else(|| raw.pointer("/endpoint/pricing"))
        .and_then(|p| serde_json::from_value(p.clone()).ok());

    Some(ModelInfo {
        id,
        input_modalities,
        pricing,
    })
}
