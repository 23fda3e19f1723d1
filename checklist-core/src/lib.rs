pub mod models;
pub mod protocol;
pub mod board;
pub mod reconcile;
pub mod seed;
pub mod errors;

pub use models::*;
pub use protocol::*;
pub use board::*;
pub use reconcile::*;
pub use errors::*;

pub type ChecklistResult<T> = Result<T, ChecklistError>;
