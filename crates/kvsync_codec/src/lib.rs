//! # kvsync Codec
//!
//! Normalizes values crossing the store boundary.
//!
//! Stores only hold strings. This crate turns caller values into the exact
//! string a store will hold (or into a removal), and decides whether two
//! store readings differ.
//!
//! ## Rules
//!
//! - Only a missing value (`None`) ever becomes a removal
//! - `""`, `"null"` and `"undefined"` are ordinary strings and are stored as-is
//! - Numbers and booleans render through one fixed, documented text form
//! - Change detection is plain string equality, identical for single-key
//!   and batch engines
//!
//! ## Usage
//!
//! ```
//! use kvsync_codec::{classify_change, encode, Encoded};
//!
//! assert_eq!(encode(Some(42)), Encoded::Set("42".into()));
//! assert_eq!(encode(None::<&str>), Encoded::Remove);
//!
//! assert!(classify_change(None, Some("")));
//! assert!(!classify_change(Some("a"), Some("a")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encoder;
mod value;

pub use encoder::{classify_change, encode, Encoded};
pub use value::StoreValue;
