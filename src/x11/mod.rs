//! X11 backend: the concrete [`Surface`](crate::traits::Surface) and
//! [`WorkspacePort`](crate::traits::WorkspacePort) implementation.
//!
//! Everything X-specific lives here: display connection, dock window,
//! Xft font and colors, EWMH properties. The rest of the crate only sees
//! the traits.

pub mod ewmh;
pub mod surface;

pub use surface::{X11Error, X11Surface};
