//! In-memory conversation transcript for parley sessions.
//!
//! This crate holds the ordered log of turns exchanged between the user and
//! the assistant during one session. Nothing is written to disk: the
//! transcript lives exactly as long as the session that owns it.
//!
//! # Core Concepts
//!
//! ## Turn
//!
//! A [`Turn`] is one recorded exchange unit: a [`Role`], the text content and
//! the moment it was recorded. Turns are immutable once appended.
//!
//! ## ConversationStore
//!
//! The [`ConversationStore`] is an append-only sequence of turns. Insertion
//! order is chronological order. It supports appending, reading the most
//! recent window, taking a full snapshot, and clearing.
//!
//! # Example
//!
//! ```
//! use storage::{ConversationStore, Role, Turn};
//!
//! let mut store = ConversationStore::new();
//! store.append(Turn::user("hello"));
//! store.append(Turn::assistant("hi there"));
//!
//! let snapshot = store.snapshot();
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(snapshot[0].role, Role::User);
//!
//! store.clear();
//! assert!(store.is_empty());
//! ```

mod store;
mod turn;

pub use store::ConversationStore;
pub use turn::{Role, Turn};
