mod common;

use common::{
    MemoryObjectStore, MemoryRecordStore, NetworkSwitch, ScriptedRemote, online_state,
    sample_upload, setup_state,
};
use qdrive_sync::services::remote::bucket_upload::BucketUploadService;
use std::sync::Arc;
use qdrive_sync::config::SyncConfig;
use qdrive_sync::error::{RemoteError, UploadError};
use qdrive_sync::services::events::SyncEvent;
use qdrive_sync::services::upload_client::UploadOutcome;

#[tokio::test]
async fn test_online_upload_goes_straight_to_remote() {
    let remote = ScriptedRemote::new();
    let (state, _network) = online_state(remote.clone()).await;

    let outcome = state
        .upload_client
        .upload(sample_upload("photo.jpg", 256))
        .await
        .unwrap();

    assert!(matches!(outcome, UploadOutcome::Uploaded(ref r) if r.document.full_name == "photo.jpg"));
    assert_eq!(remote.call_count(), 1);
    assert_eq!(state.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_offline_upload_is_queued_without_remote_call() {
    let remote = ScriptedRemote::new();
    let state = setup_state(remote.clone(), NetworkSwitch::new(false), SyncConfig::development()).await;
    let mut events = state.events.subscribe();

    let outcome = state
        .upload_client
        .upload(sample_upload("photo.jpg", 256))
        .await
        .unwrap();

    let UploadOutcome::SavedOffline(enqueued) = outcome else {
        panic!("expected the upload to be queued");
    };
    assert!(enqueued.offline);
    assert_eq!(remote.call_count(), 0);

    let queued = state.store.get(enqueued.id).await.unwrap().unwrap();
    assert_eq!(queued.file.name, "photo.jpg");
    assert_eq!(queued.owner_id, "user-1");
    assert_eq!(queued.path, "/drive");
    assert!(matches!(
        events.try_recv().unwrap(),
        SyncEvent::UploadQueued { id, .. } if id == enqueued.id
    ));
}

#[tokio::test]
async fn test_network_failure_falls_back_to_queue() {
    let remote = ScriptedRemote::new();
    remote.fail("big.mov", RemoteError::Network("connection refused".into()));
    let (state, _network) = online_state(remote.clone()).await;

    let outcome = state
        .upload_client
        .upload(sample_upload("big.mov", 1024))
        .await
        .unwrap();

    assert!(matches!(outcome, UploadOutcome::SavedOffline(_)));
    assert_eq!(remote.call_count(), 1);
    assert_eq!(state.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_non_network_failure_is_surfaced() {
    let remote = ScriptedRemote::new();
    remote.fail("bad.exe", RemoteError::Quota("bucket full".into()));
    let (state, _network) = online_state(remote.clone()).await;

    let err = state
        .upload_client
        .upload(sample_upload("bad.exe", 64))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Remote(RemoteError::Quota(_))));
    assert_eq!(state.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_file_is_rejected_before_queueing() {
    let remote = ScriptedRemote::new();
    let config = SyncConfig {
        max_file_size: 100,
        ..SyncConfig::development()
    };
    let state = setup_state(remote.clone(), NetworkSwitch::new(false), config).await;

    let err = state
        .upload_client
        .upload(sample_upload("huge.bin", 101))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::TooLarge { size: 101, max: 100 }));
    assert_eq!(state.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_file_name_is_sanitized() {
    let remote = ScriptedRemote::new();
    let state = setup_state(remote, NetworkSwitch::new(false), SyncConfig::development()).await;

    let UploadOutcome::SavedOffline(enqueued) = state
        .upload_client
        .upload(sample_upload("../../etc/what?.txt", 8))
        .await
        .unwrap()
    else {
        panic!("expected the upload to be queued");
    };

    let queued = state.store.get(enqueued.id).await.unwrap().unwrap();
    assert_eq!(queued.file.name, "what_.txt");
}

#[tokio::test]
async fn test_unreclaimed_object_is_queued_for_cleanup() {
    let objects = MemoryObjectStore::new();
    let records = MemoryRecordStore::new();
    let remote = Arc::new(BucketUploadService::new(
        objects.clone(),
        records.clone(),
        "http://cdn.test",
    ));
    let (state, _network) = online_state(remote).await;

    records.fail_next(RemoteError::Validation("bad owner".into()));
    objects.fail_deletes(true);
    let upload = sample_upload("stuck.txt", 32);
    let key = BucketUploadService::object_key(&upload.upload_key);

    let UploadOutcome::SavedOffline(enqueued) = state.upload_client.upload(upload).await.unwrap()
    else {
        panic!("expected the upload to be queued");
    };
    assert!(objects.contains(&key));

    // The queued record holds the key, so the next drain rewrites and settles it
    let queued = state.store.get(enqueued.id).await.unwrap().unwrap();
    assert_eq!(BucketUploadService::object_key(&queued.upload_key), key);

    objects.fail_deletes(false);
    state.orchestrator.drain().await.unwrap();
    assert_eq!(state.store.count().await.unwrap(), 0);
    assert_eq!(records.len(), 1);
    assert_eq!(objects.len(), 1);
}
