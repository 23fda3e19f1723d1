pub mod api;
pub mod errors;
pub mod storage;

pub use api::ChecklistClient;
pub use errors::{ClientError, ClientResult};
pub use storage::{LocalStorage, StoredUser};
