//! `unionpath` is a library for whiteout and path semantics of stacked union
//! filesystem layers.
//!
//! Container image formats stack incremental filesystem layers on top of each
//! other. When the stack is squashed into a single logical view, an upper
//! layer can delete a lower layer's file with a *whiteout* marker, and can
//! hide an entire lower directory with an *opaque whiteout* marker. Two
//! historical encodings of that intent exist: the AUFS name-based convention
//! (a reserved `.wh.` filename prefix inside the layer's entry listing) and
//! the overlayfs attribute-based convention (a character device standing in
//! for the deleted file, and a `trusted.overlay.opaque` extended attribute on
//! an opaque directory).
//!
//! This crate classifies observed layer paths under both conventions and
//! derives the real paths the markers refer to, so a squashing engine can
//! apply insert/delete decisions in the right order.

#![warn(missing_docs)]

mod convention;
mod error;
mod mount;
mod path;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use convention::*;
pub use error::*;
pub use mount::*;
pub use path::*;
