pub mod connectivity;
pub mod dispatcher;
pub mod enqueue;
pub mod events;
pub mod orchestrator;
pub mod queue_store;
pub mod remote;
pub mod retry;
pub mod upload_client;
