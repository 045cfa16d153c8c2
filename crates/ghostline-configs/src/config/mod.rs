pub mod defaults;
mod loader;
pub mod types;

pub use loader::{MAX_SOURCE_ID_LEN, VALID_ONLINE_DDL_SCHEMES};
pub use types::*;
