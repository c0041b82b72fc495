use thiserror::Error;
use tracing::{debug, info};

use super::models::TrackMetadata;
use crate::catalog_api::{
    verify_audio_features, CatalogApi, CatalogError, VerificationReport, SAVED_TRACKS_PAGE_SIZE,
};
use crate::store::LibraryStore;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Walks the participant's saved tracks on the provider and upserts them.
/// Each page is written as soon as it is fetched. Returns the number of
/// tracks written.
pub async fn import_library<S: LibraryStore + ?Sized>(
    store: &S,
    api: &dyn CatalogApi,
    token: &str,
    participant_id: &str,
) -> Result<usize, LibraryError> {
    let mut offset = 0;
    let mut written = 0;
    loop {
        let page = api
            .get_saved_tracks_page(token, offset, SAVED_TRACKS_PAGE_SIZE)
            .await?;
        let fetched = page.items.len() as u32;
        let tracks: Vec<TrackMetadata> = page.items.into_iter().map(|i| i.track.into()).collect();
        written += store.upsert_library_tracks(participant_id, tracks)?;
        debug!(
            "Imported page at offset {} for {} ({} tracks)",
            offset, participant_id, fetched
        );

        if page.next.is_none() || fetched == 0 {
            break;
        }
        offset += fetched;
    }
    info!("Imported {} tracks for {}", written, participant_id);
    Ok(written)
}

/// Verifies audio features for every track in the participant's library.
pub async fn verify_library_audio_features<S: LibraryStore + ?Sized>(
    store: &S,
    api: &dyn CatalogApi,
    token: &str,
    participant_id: &str,
) -> Result<VerificationReport, LibraryError> {
    let track_ids: Vec<String> = store
        .get_participant_tracks(participant_id)?
        .into_iter()
        .map(|t| t.track_id)
        .collect();
    let report = verify_audio_features(api, token, &track_ids).await?;
    info!(
        "Audio features for {}: {} ok, {} failed",
        participant_id,
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(report)
}
