//! Asynchronous request coordination over a cascading cache.

pub mod request;
pub mod types;

pub use request::RequestCoordinator;
pub use types::{
    LoadRequest, Loader, RequestCompleteArgs, RequestEvents, RequestFailedArgs, RequestState,
};
