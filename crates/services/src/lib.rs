pub mod error;
pub mod memory;
pub mod repository;
pub mod service;
pub mod sqlite;

pub use error::{ServiceError, StoreError};
pub use memory::MemoryStore;
pub use repository::QuizRepository;
pub use service::{FinishOutcome, QuizService, ReconcileOutcome, ServiceConfig, UserStats};
pub use sqlite::SqliteStore;
