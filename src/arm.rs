//! Generic Azure Resource Manager transport: authenticated requests,
//! error decoding, `nextLink` paging and long-running operation polling.

mod client;
mod error;
mod pager;
mod poller;
mod types;

pub use client::{ArmClient, ArmRequest, ArmResponse, json_body};
pub use error::{ArmError, OptionalExt};
pub use poller::PollingStrategy;
pub use types::{DEFAULT_POLL_INTERVAL, ErrorDetail, MAX_RETRIES, Page, PollingStatus};
