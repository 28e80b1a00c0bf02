//! Client Module
//!
//! # Architecture
//!
//! - **`local_db`** - Local SQLite key/value store
//! - **`session`** - Session store persisted through `local_db`
//! - **`backend`** - Adapters for the managed provider and the relational API
//! - **`thread`** - Flat comment rows to reply trees
//! - **`forum`** - Forum controller and post list projection
//! - **`main`** - `forum` command line binary
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - CLI entry point
//! ├── local_db/       - SQLite store and schema
//! ├── session.rs      - Session store
//! ├── backend/        - Backend enum, managed and relational adapters
//! ├── thread.rs       - Thread builder
//! └── forum/          - Controller and filters
//! ```

pub mod local_db;
pub mod session;
pub mod backend;
pub mod thread;
pub mod forum;

// Re-export commonly used types
pub use local_db::LocalStore;
pub use session::SessionStore;
pub use backend::{Backend, ManagedAdapter, RelationalApiAdapter};
pub use thread::{build_threads, preorder, ThreadNode};
pub use forum::{ForumController, LoadReport, PostFilter, SortOrder, KNOWN_SUBTOPICS};
