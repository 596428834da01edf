use std::sync::Arc;
use std::time::Duration;

use signcam_lib::capture::{FrameDelivery, TriggerState};
use signcam_lib::classifier::FakeImageClassifier;
use signcam_lib::frame::{FrameGeometry, FrameOrientation, PixelFormat, RawFrame};
use signcam_lib::history::commands::{
    delete_all_history, delete_history_row, delete_history_rows, get_history_count,
    get_history_entry, list_history,
};
use signcam_lib::transform::CropRegion;
use signcam_lib::{capture_photo, get_config, get_latest_preview, update_config, AppState};

// Landscape sensor frames shown rotated into portrait.
const GEOMETRY: FrameGeometry = FrameGeometry {
    width: 640,
    height: 480,
    orientation: FrameOrientation::Right,
};

fn camera_frame(shade: u8) -> RawFrame {
    let data = [shade, shade, shade, 255].repeat(640 * 480);
    RawFrame::new(640, 480, PixelFormat::Bgra8, FrameOrientation::Right, data).unwrap()
}

async fn open(dir: &std::path::Path) -> AppState {
    AppState::open(
        dir,
        GEOMETRY,
        Arc::new(FakeImageClassifier::with_seed((48, 48), 11)),
    )
    .await
    .unwrap()
}

async fn take_picture(state: &AppState, shade: u8) {
    let mut previews = state.capture().subscribe_previews();
    previews.borrow_and_update();

    assert_eq!(capture_photo(state), Ok(true));
    assert_eq!(
        state.capture().trigger_state(),
        TriggerState::ArmedForNextFrame
    );
    assert_eq!(state.deliver_frame(camera_frame(shade)), FrameDelivery::Queued);

    tokio::time::timeout(Duration::from_secs(10), previews.changed())
        .await
        .expect("capture did not complete in time")
        .unwrap();
}

#[tokio::test]
async fn capture_then_browse_and_edit_history() {
    let dir = tempfile::tempdir().unwrap();
    let state = open(dir.path()).await;

    // 300px square centred in the upright 480x640 frame.
    assert_eq!(state.capture().geometry(), GEOMETRY);
    assert_eq!(state.capture().crop_region(), CropRegion::square(90, 170, 300));

    assert_eq!(get_history_count(&state).await, Ok(0));
    assert_eq!(get_latest_preview(&state), Ok(None));
    assert_eq!(state.deliver_frame(camera_frame(0)), FrameDelivery::Ignored);

    for shade in [10, 20, 30] {
        take_picture(&state, shade).await;
    }

    assert_eq!(get_history_count(&state).await, Ok(3));
    let rows = list_history(&state).await.unwrap();
    assert!(rows.iter().all(|row| row.label.is_some()));

    let latest = get_latest_preview(&state).unwrap().unwrap();
    assert_eq!(latest.entry_id, rows[2].id);

    let middle_id = rows[1].id.clone();
    assert_eq!(delete_history_rows(&state, vec![2, 0]).await, Ok(2));
    let only = get_history_entry(&state, 0).await.unwrap().unwrap();
    assert_eq!(only.id, middle_id);

    assert_eq!(delete_history_row(&state, 0).await, Ok(true));
    assert_eq!(delete_all_history(&state).await, Ok(0));
    assert!(list_history(&state).await.unwrap().is_empty());

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutter_while_pending_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let state = open(dir.path()).await;

    assert_eq!(capture_photo(&state), Ok(true));
    assert_eq!(capture_photo(&state), Ok(false));

    state.shutdown().await.unwrap();
    assert_eq!(get_history_count(&state).await, Ok(0));
}

#[tokio::test]
async fn reopening_restores_history_and_preview() {
    let dir = tempfile::tempdir().unwrap();

    let first_id = {
        let state = open(dir.path()).await;
        take_picture(&state, 99).await;
        let id = get_latest_preview(&state).unwrap().unwrap().entry_id;
        state.shutdown().await.unwrap();
        id
    };

    let state = open(dir.path()).await;
    assert_eq!(get_history_count(&state).await, Ok(1));
    assert_eq!(
        get_latest_preview(&state).unwrap().map(|p| p.entry_id),
        Some(first_id)
    );
    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn crop_side_larger_than_frame_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    {
        let state = open(dir.path()).await;
        let mut config = get_config(&state).unwrap();
        config.crop_side = 600;
        update_config(&state, config).unwrap();
        state.shutdown().await.unwrap();
    }

    let result = AppState::open(
        dir.path(),
        GEOMETRY,
        Arc::new(FakeImageClassifier::with_seed((48, 48), 1)),
    )
    .await;
    assert!(result.is_err());
}
