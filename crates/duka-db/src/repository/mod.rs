//! # Repository Module
//!
//! Database repository implementations for the Duka transaction queue.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Checkout / Sync Engine                                                 │
//! │       │                                                                 │
//! │       │  db.queue().append(&record)                                    │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  QueueRepository                                                       │
//! │  ├── append(&self, record)                                             │
//! │  ├── list_pending(&self)                                               │
//! │  ├── mark_synced(&self, storage_id)                                    │
//! │  └── record_failure(&self, storage_id, error)                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (in-memory SQLite)                                     │
//! │  • SQL is isolated in one place                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`queue::QueueRepository`] - Durable offline transaction queue

pub mod queue;
