//! Model bundles: weights manifests, shard validation, and the fetch seam.
//!
//! Each bundle is published as `<name>-weights_manifest.json` next to the
//! shard files it lists. The manifest is a JSON array of weight groups:
//!
//! ```json
//! [{ "paths": ["tiny_face_detector_model-shard1"],
//!    "weights": [{ "name": "conv0/filters", "shape": [3, 3, 3, 16], "dtype": "float32" }] }]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Fallback host when no model URL is configured.
pub const DEFAULT_MODEL_URL: &str = "https://cdn.casdoor.com/casdoor/models";

const MANIFEST_SUFFIX: &str = "-weights_manifest.json";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("fetching {resource}: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid manifest for {bundle}: {source}")]
    Manifest {
        bundle: ModelBundle,
        #[source]
        source: serde_json::Error,
    },
    #[error("{bundle} is corrupt: {reason}")]
    Corrupt { bundle: ModelBundle, reason: String },
    #[error("building analyzer: {0}")]
    Backend(String),
}

/// The three networks a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBundle {
    TinyFaceDetector,
    FaceLandmark68,
    FaceRecognition,
}

impl ModelBundle {
    pub const ALL: [ModelBundle; 3] = [
        ModelBundle::TinyFaceDetector,
        ModelBundle::FaceLandmark68,
        ModelBundle::FaceRecognition,
    ];

    /// Published model name; manifest and shard file names derive from it.
    pub fn model_name(self) -> &'static str {
        match self {
            ModelBundle::TinyFaceDetector => "tiny_face_detector_model",
            ModelBundle::FaceLandmark68 => "face_landmark_68_model",
            ModelBundle::FaceRecognition => "face_recognition_model",
        }
    }

    pub fn manifest_file(self) -> String {
        format!("{}{MANIFEST_SUFFIX}", self.model_name())
    }
}

impl fmt::Display for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

/// One tensor entry in a weights manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<Quantization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantization {
    pub dtype: String,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub min: Option<f32>,
}

impl WeightSpec {
    /// Bytes this tensor occupies in the shard stream, `None` if the shape
    /// overflows `usize`.
    pub fn byte_len(&self) -> Option<usize> {
        let elements = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))?;
        let dtype = self
            .quantization
            .as_ref()
            .map_or(self.dtype.as_str(), |q| q.dtype.as_str());
        let width = match dtype {
            "uint8" | "int8" | "bool" => 1,
            "uint16" | "int16" | "float16" => 2,
            _ => 4,
        };
        elements.checked_mul(width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightGroup {
    pub paths: Vec<String>,
    pub weights: Vec<WeightSpec>,
}

pub type WeightsManifest = Vec<WeightGroup>;

/// A fetched and validated bundle.
#[derive(Debug, Clone)]
pub struct BundleData {
    pub bundle: ModelBundle,
    pub manifest: WeightsManifest,
    /// Shard contents in manifest order.
    pub shards: Vec<Vec<u8>>,
}

impl BundleData {
    pub fn total_bytes(&self) -> usize {
        self.shards.iter().map(Vec::len).sum()
    }

    /// Check the shard payload against the byte count the manifest implies.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.shards.is_empty() {
            return Err(ModelError::Corrupt {
                bundle: self.bundle,
                reason: "manifest lists no shards".into(),
            });
        }
        let expected = self
            .manifest
            .iter()
            .flat_map(|g| g.weights.iter())
            .try_fold(0usize, |acc, w| acc.checked_add(w.byte_len()?))
            .ok_or_else(|| ModelError::Corrupt {
                bundle: self.bundle,
                reason: "manifest tensor sizes overflow".into(),
            })?;
        let actual = self.total_bytes();
        if expected != actual {
            return Err(ModelError::Corrupt {
                bundle: self.bundle,
                reason: format!("manifest describes {expected} bytes, shards hold {actual}"),
            });
        }
        Ok(())
    }
}

/// All three bundles, ready to hand to an inference backend.
#[derive(Debug, Clone)]
pub struct ModelSet {
    pub detector: BundleData,
    pub landmarks: BundleData,
    pub recognition: BundleData,
}

impl ModelSet {
    pub fn get(&self, bundle: ModelBundle) -> &BundleData {
        match bundle {
            ModelBundle::TinyFaceDetector => &self.detector,
            ModelBundle::FaceLandmark68 => &self.landmarks,
            ModelBundle::FaceRecognition => &self.recognition,
        }
    }
}

/// Where bundle resources come from (an HTTP host, a directory, a fixture).
pub trait ModelSource: Send + Sync {
    /// Fetch one resource by file name relative to the model root.
    fn fetch(&self, file: &str) -> impl Future<Output = Result<Vec<u8>, ModelError>> + Send;
}

/// Fetch a bundle's manifest, then its shards, then validate the sizes.
pub async fn load_bundle<S: ModelSource>(
    source: &S,
    bundle: ModelBundle,
) -> Result<BundleData, ModelError> {
    let raw = source.fetch(&bundle.manifest_file()).await?;
    let manifest: WeightsManifest = serde_json::from_slice(&raw)
        .map_err(|source| ModelError::Manifest { bundle, source })?;

    let mut shards = Vec::new();
    for path in manifest.iter().flat_map(|g| g.paths.iter()) {
        shards.push(source.fetch(path).await?);
    }

    let data = BundleData {
        bundle,
        manifest,
        shards,
    };
    data.validate()?;
    tracing::debug!(
        %bundle,
        shards = data.shards.len(),
        bytes = data.total_bytes(),
        "bundle loaded"
    );
    Ok(data)
}
