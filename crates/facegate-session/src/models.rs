//! Remote model loading over HTTP.

use facegate_core::models::{load_bundle, ModelBundle, ModelError, ModelSet, ModelSource};
use facegate_core::{FaceAnalyzer, ModelProvider};
use std::time::Duration;

/// Fetches bundle resources from a base URL.
pub struct HttpModelSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpModelSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Fetch {
                resource: base_url.to_string(),
                source: Box::new(e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, file: &str) -> String {
        format!("{}/{}", self.base_url, file.trim_start_matches('/'))
    }
}

impl ModelSource for HttpModelSource {
    async fn fetch(&self, file: &str) -> Result<Vec<u8>, ModelError> {
        let url = self.url_for(file);
        let fetch_err = |e: reqwest::Error| ModelError::Fetch {
            resource: url.clone(),
            source: Box::new(e),
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_err)?;
        let bytes = response.bytes().await.map_err(fetch_err)?;

        tracing::debug!(url = %url, bytes = bytes.len(), "fetched model resource");
        Ok(bytes.to_vec())
    }
}

/// Load all three bundles concurrently; the first failure rejects the set.
pub async fn load_model_set<S: ModelSource>(source: &S) -> Result<ModelSet, ModelError> {
    let (detector, landmarks, recognition) = tokio::try_join!(
        load_bundle(source, ModelBundle::TinyFaceDetector),
        load_bundle(source, ModelBundle::FaceLandmark68),
        load_bundle(source, ModelBundle::FaceRecognition),
    )?;
    Ok(ModelSet {
        detector,
        landmarks,
        recognition,
    })
}

/// Provider that fetches the model set and hands it to an inference backend.
pub struct RemoteModelProvider<S, F> {
    source: S,
    build: F,
}

impl<S, F> RemoteModelProvider<S, F> {
    pub fn new(source: S, build: F) -> Self {
        Self { source, build }
    }
}

impl<S, F, A> ModelProvider for RemoteModelProvider<S, F>
where
    S: ModelSource + 'static,
    F: Fn(ModelSet) -> Result<A, ModelError> + Send + Sync + 'static,
    A: FaceAnalyzer,
{
    type Analyzer = A;

    async fn load(&self) -> Result<A, ModelError> {
        let set = load_model_set(&self.source).await?;
        tracing::info!(
            detector_bytes = set.detector.total_bytes(),
            landmark_bytes = set.landmarks.total_bytes(),
            recognition_bytes = set.recognition.total_bytes(),
            "model set fetched"
        );
        (self.build)(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_core::scripted::ScriptedAnalyzer;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory host publishing one float32 tensor of `len` elements per bundle.
    struct FixtureSource {
        files: HashMap<String, Vec<u8>>,
        fetches: AtomicUsize,
    }

    impl FixtureSource {
        fn complete() -> Self {
            let mut files = HashMap::new();
            for bundle in ModelBundle::ALL {
                let shard = format!("{}-shard1", bundle.model_name());
                let manifest = format!(
                    r#"[{{"paths":["{shard}"],"weights":[{{"name":"w","shape":[4],"dtype":"float32"}}]}}]"#
                );
                files.insert(bundle.manifest_file(), manifest.into_bytes());
                files.insert(shard, vec![0u8; 16]);
            }
            Self {
                files,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl ModelSource for FixtureSource {
        async fn fetch(&self, file: &str) -> Result<Vec<u8>, ModelError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.files.get(file).cloned().ok_or_else(|| ModelError::Fetch {
                resource: file.to_string(),
                source: "404 Not Found".into(),
            })
        }
    }

    #[test]
    fn test_url_for_joins_cleanly() {
        let src = HttpModelSource::new("https://cdn.example.com/models/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            src.url_for("face_recognition_model-weights_manifest.json"),
            "https://cdn.example.com/models/face_recognition_model-weights_manifest.json"
        );
        assert_eq!(src.url_for("/a"), "https://cdn.example.com/models/a");
    }

    #[tokio::test]
    async fn test_load_model_set_fetches_everything() {
        let source = FixtureSource::complete();
        let set = load_model_set(&source).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 6);
        for bundle in ModelBundle::ALL {
            assert_eq!(set.get(bundle).bundle, bundle);
            assert_eq!(set.get(bundle).total_bytes(), 16);
        }
    }

    #[tokio::test]
    async fn test_one_missing_bundle_rejects_the_set() {
        let mut source = FixtureSource::complete();
        source.files.remove("face_landmark_68_model-shard1");
        let err = load_model_set(&source).await.unwrap_err();
        assert!(err.to_string().contains("face_landmark_68_model-shard1"), "{err}");
    }

    #[tokio::test]
    async fn test_remote_provider_builds_analyzer() {
        let provider = RemoteModelProvider::new(FixtureSource::complete(), |set: ModelSet| -> Result<ScriptedAnalyzer, ModelError> {
            assert_eq!(set.recognition.shards.len(), 1);
            Ok(ScriptedAnalyzer::default())
        });
        let analyzer = provider.load().await.unwrap();
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_provider_propagates_backend_error() {
        let provider = RemoteModelProvider::new(FixtureSource::complete(), |_set: ModelSet| -> Result<ScriptedAnalyzer, ModelError> {
            Err(ModelError::Backend("unsupported op".into()))
        });
        assert!(matches!(
            provider.load().await,
            Err(ModelError::Backend(_))
        ));
    }
}
