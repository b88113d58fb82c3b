//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `WorkerState`: the state machine a crawl worker moves through per page

mod worker_state;

pub use worker_state::WorkerState;
