pub mod api;
pub mod models;
pub mod monitor;
pub mod poller;
pub mod reconcile;
pub mod simulator;

pub use api::{ApiError, HomeApiClient, HomeDataProvider};
pub use poller::{PollHandle, PollSeq, StateCell};
