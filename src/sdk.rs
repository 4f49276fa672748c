//! Per-service API clients.
//!
//! Each module pins one `API_VERSION` and exposes typed models plus a thin
//! client over [`crate::arm::ArmClient`]. Operations take typed resource IDs
//! so callers cannot hit the wrong URL template.

pub mod cdn;
pub mod containerservice;
pub mod resources;
pub mod storage;

use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;
