// GeoJSON download artifact for the current result

use serde_json::Value;
use std::path::Path;

use crate::error::ClientError;
use crate::simulation_client::SimulationResult;

pub const GEOJSON_FILE_NAME: &str = "impact_result.geojson";
pub const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl Download {
    /// Pretty-printed geometry collection; `{}` when the result carried none
    pub fn geojson(result: &SimulationResult) -> Self {
        let empty = Value::Object(Default::default());
        let geojson = result.geojson.as_ref().unwrap_or(&empty);
        Self {
            file_name: GEOJSON_FILE_NAME,
            content_type: GEOJSON_CONTENT_TYPE,
            body: serde_json::to_string_pretty(geojson).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    /// Write into `dir` under the artifact's file name, or to `path` itself when it is a file path
    pub async fn save(&self, path: &Path) -> Result<std::path::PathBuf, ClientError> {
        let target = if path.is_dir() {
            path.join(self.file_name)
        } else {
            path.to_path_buf()
        };
        tokio::fs::write(&target, self.body.as_bytes())
            .await
            .map_err(|e| ClientError::Io(format!("{}: {}", target.display(), e)))?;
        Ok(target)
    }
}
