//! Remote mailbox-folder adapter for the PrintVendo kiosk backend.
//!
//! The kiosk, the backend, and the billing terminal have no direct channel
//! to each other; they communicate through one remote folder per machine,
//! used as a mailbox of named sentinel files. This crate owns the durability
//! side of that protocol:
//!
//! - [`Mailbox`] - the trait every store backend satisfies
//! - [`DriveMailbox`] - the Google Drive v3 REST implementation
//!
//! # Consumption semantics
//!
//! `delete` is the only consumption primitive. It returns `Ok(true)` when
//! this caller removed the entry and `Ok(false)` when the entry was already
//! gone, meaning another poller consumed it first. Callers must treat a
//! `false` as "I did not win" and never act on the entry. The store offers
//! no atomic claim primitive, so this return value is the single source of
//! truth in every race.
//!
//! # Write semantics
//!
//! `write` creates a new entry and does not replace a same-named one
//! atomically. Writers that need replacement semantics delete first; readers
//! tolerate duplicates by taking the newest match.

pub mod drive;
pub mod error;
pub mod traits;

pub use drive::{DriveConfig, DriveMailbox};
pub use error::{MailboxError, Result};
pub use traits::{EntryRef, FolderRef, Mailbox};
