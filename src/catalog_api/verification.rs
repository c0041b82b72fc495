//! Checks which tracks the provider can produce audio features for.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{CatalogApi, CatalogError};

/// Maximum ids per batch request.
pub const AUDIO_FEATURES_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeSet<String>,
}

/// Looks up audio features for every distinct id, in batches. A failed batch
/// is retried one id at a time. An `Unauthorized` error aborts the whole run
/// so that the caller can refresh the token.
pub async fn verify_audio_features(
    api: &dyn CatalogApi,
    token: &str,
    track_ids: &[String],
) -> Result<VerificationReport, CatalogError> {
    let mut seen = BTreeSet::new();
    let unique: Vec<String> = track_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect();

    let mut report = VerificationReport::default();
    for chunk in unique.chunks(AUDIO_FEATURES_BATCH_SIZE) {
        match api.get_audio_features(token, chunk).await {
            Ok(features) => {
                for (index, id) in chunk.iter().enumerate() {
                    let found = features.get(index).map(Option::is_some).unwrap_or(false);
                    if found {
                        report.succeeded.insert(id.clone());
                    } else {
                        report.failed.insert(id.clone());
                    }
                }
            }
            Err(CatalogError::Unauthorized) => return Err(CatalogError::Unauthorized),
            Err(err) => {
                warn!(
                    "Audio features batch of {} failed, retrying per item: {}",
                    chunk.len(),
                    err
                );
                for id in chunk {
                    match api.get_audio_feature(token, id).await {
                        Ok(_) => {
                            report.succeeded.insert(id.clone());
                        }
                        Err(CatalogError::Unauthorized) => {
                            return Err(CatalogError::Unauthorized)
                        }
                        Err(err) => {
                            debug!("Audio features for {} unavailable: {}", id, err);
                            report.failed.insert(id.clone());
                        }
                    }
                }
            }
        }
    }
    Ok(report)
}
