//! **xtagbar** is a centered X11 status bar.
//!
//! The bar renders a row of clickable workspace tags, a centered status
//! line fed by a supervised child process, and optional right-aligned
//! modules, in a borderless dock window pinned to the top of the screen.
//!
//! # Architecture
//!
//! The crate is organised around three seams defined in [`traits`]:
//!
//! * [`traits::Surface`]: text measurement, drawing, and input events, so
//!   the layout and event loop are not coupled to Xlib.
//! * [`traits::WorkspacePort`]: the "current workspace" protocol query,
//!   used when the focused-workspace file is absent.
//! * [`traits::CommandRunner`]: fire-and-forget shell invocation for
//!   workspace switching.
//!
//! The concrete X11/Xft backend lives in [`x11`]; [`bar::Bar`] is the
//! single-threaded, poll-based event loop; [`supervisor`] and [`linebuf`]
//! keep the status commands alive and turn their output into lines;
//! [`layout`] is the pure geometry function in between.

pub mod bar;
pub mod color;
pub mod config;
pub mod layout;
pub mod linebuf;
pub mod runner;
pub mod supervisor;
pub mod traits;
pub mod watch;
pub mod workspace;
pub mod x11;
