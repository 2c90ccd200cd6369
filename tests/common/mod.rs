#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use qdrive_sync::config::SyncConfig;
use qdrive_sync::error::RemoteError;
use qdrive_sync::infrastructure::database;
use qdrive_sync::models::{FileBlob, FileDocument, FileRecord, NewUpload};
use qdrive_sync::services::connectivity::{ConnectivityMonitor, ReachabilityProbe};
use qdrive_sync::services::remote::object_store::ObjectStore;
use qdrive_sync::services::remote::records::FileRecordStore;
use qdrive_sync::services::remote::{PutFileRequest, RemoteUploadService};
use qdrive_sync::utils::file_type::classify_file;
use qdrive_sync::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub async fn setup_test_db() -> sea_orm::DatabaseConnection {
    database::setup_database("sqlite::memory:").await.unwrap()
}

pub fn sample_upload(name: &str, size: usize) -> NewUpload {
    let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    NewUpload::new(
        FileBlob::detect(name, None, Bytes::from(bytes)),
        "user-1",
        "account-1",
        "/drive",
    )
}

pub fn record_for(upload_key: &str, name: &str, size: usize, owner: &str, account: &str) -> FileRecord {
    let (file_type, extension) = classify_file(name);
    FileRecord {
        id: upload_key.to_string(),
        document: FileDocument {
            file_type,
            full_name: name.to_string(),
            url: format!("http://cdn.test/files/{}", upload_key),
            extension,
            size: size as i64,
            owner: owner.to_string(),
            account_id: account.to_string(),
            users: Vec::new(),
            bucket_file_id: format!("files/{}", upload_key),
        },
    }
}

/// Remote reachability flipped by the test.
pub struct NetworkSwitch(AtomicBool);

impl NetworkSwitch {
    pub fn new(reachable: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(reachable)))
    }

    pub fn set(&self, reachable: bool) {
        self.0.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReachabilityProbe for NetworkSwitch {
    async fn is_reachable(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Remote double: records every call, fails chosen file names, can drop
/// connectivity after a number of calls.
#[derive(Default)]
pub struct ScriptedRemote {
    calls: Mutex<Vec<String>>,
    released: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, RemoteError>>,
    offline_after: Mutex<Option<(usize, Arc<ConnectivityMonitor>)>>,
    latency: Mutex<Duration>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, name: &str, error: RemoteError) {
        self.failures.lock().unwrap().insert(name.to_string(), error);
    }

    pub fn heal(&self, name: &str) {
        self.failures.lock().unwrap().remove(name);
    }

    pub fn go_offline_after(&self, calls: usize, monitor: Arc<ConnectivityMonitor>) {
        *self.offline_after.lock().unwrap() = Some((calls, monitor));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteUploadService for ScriptedRemote {
    async fn put_file(&self, request: PutFileRequest<'_>) -> Result<FileRecord, RemoteError> {
        let made = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.file.name.clone());
            calls.len()
        };

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if let Some((limit, monitor)) = self.offline_after.lock().unwrap().as_ref() {
            if made >= *limit {
                monitor.mark_offline();
            }
        }

        if let Some(error) = self.failures.lock().unwrap().get(&request.file.name) {
            return Err(error.clone());
        }

        Ok(record_for(
            request.upload_key,
            &request.file.name,
            request.file.size(),
            request.owner_id,
            request.account_id,
        ))
    }

    async fn release_file(&self, upload_key: &str) -> Result<(), RemoteError> {
        self.released.lock().unwrap().push(upload_key.to_string());
        Ok(())
    }
}

/// Bucket double.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: Mutex<usize>,
    fail_delete: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn puts(&self) -> usize {
        *self.puts.lock().unwrap()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), RemoteError> {
        *self.puts.lock().unwrap() += 1;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), RemoteError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("delete timed out".into()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, RemoteError> {
        Ok(self.contains(key))
    }
}

/// Document collection double. `fail_next` makes the next create fail once.
#[derive(Default)]
pub struct MemoryRecordStore {
    docs: Mutex<HashMap<String, FileRecord>>,
    fail_next: Mutex<Option<RemoteError>>,
}

impl MemoryRecordStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, error: RemoteError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn insert(&self, record: FileRecord) {
        self.docs.lock().unwrap().insert(record.id.clone(), record);
    }
}

#[async_trait]
impl FileRecordStore for MemoryRecordStore {
    async fn create_record(
        &self,
        document_id: &str,
        document: &FileDocument,
    ) -> Result<FileRecord, RemoteError> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }
        let mut docs = self.docs.lock().unwrap();
        if docs.contains_key(document_id) {
            return Err(RemoteError::AlreadyExists(document_id.to_string()));
        }
        let record = FileRecord {
            id: document_id.to_string(),
            document: document.clone(),
        };
        docs.insert(document_id.to_string(), record.clone());
        Ok(record)
    }

    async fn get_record(&self, document_id: &str) -> Result<Option<FileRecord>, RemoteError> {
        Ok(self.docs.lock().unwrap().get(document_id).cloned())
    }
}

/// Fully wired agent over an in-memory queue.
pub async fn setup_state(
    remote: Arc<dyn RemoteUploadService>,
    network: Arc<NetworkSwitch>,
    config: SyncConfig,
) -> AppState {
    let db = setup_test_db().await;
    AppState::new(db, remote, network, config)
}

/// Same, already confirmed online.
pub async fn online_state(remote: Arc<dyn RemoteUploadService>) -> (AppState, Arc<NetworkSwitch>) {
    let network = NetworkSwitch::new(true);
    let state = setup_state(remote, network.clone(), SyncConfig::development()).await;
    assert!(state.monitor.check_now().await);
    (state, network)
}
