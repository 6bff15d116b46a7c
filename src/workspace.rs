//! Workspace state resolution.
//!
//! The bar learns which workspaces exist from two externally-owned files
//! (written by the window manager's scripts) with the desktop-session
//! protocol as a fallback for the focused id. State is recomputed from
//! scratch on every redraw, so there is no incremental mutation to get stale.
//!
//! File formats are deliberately loose: the occupied file may separate ids
//! with commas, spaces, newlines, or anything else that is not a digit.

use crate::traits::WorkspacePort;
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Focused workspace plus the set of occupied workspaces.
///
/// Invariant: `focused` is always a member of `occupied` (see
/// [`finalize`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceState {
    /// 1-based focused workspace id, within `1..=count`.
    pub focused: u32,
    /// Ascending set of occupied workspace ids.
    pub occupied: BTreeSet<u32>,
}

/// Read the first line of `path`, newline stripped.
///
/// A missing or unreadable file yields `None`, never an error.
pub fn read_first_line(path: &Path) -> Option<String> {
    let file = std::fs::File::open(path).ok()?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).ok()?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Some(line)
}

/// Read the whole of `path` as text. Missing file yields the empty string.
pub fn read_whole_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// Resolve the focused workspace id.
///
/// Precedence: first line of the focused-workspace file if it parses as an
/// integer, else the protocol's current workspace, else `1`. The result is
/// clamped to `1..=count`.
pub fn resolve_focused(path: Option<&Path>, port: &impl WorkspacePort, count: u32) -> u32 {
    let from_file = path
        .and_then(read_first_line)
        .and_then(|line| line.trim().parse::<i64>().ok());
    let focused = match from_file {
        Some(n) => n,
        None => port.current_workspace().map(i64::from).unwrap_or(1),
    };
    focused.clamp(1, i64::from(count)) as u32
}

/// Resolve the occupied workspace set.
///
/// Scans the occupied-workspace file for maximal runs of digits; each run
/// that parses to an id in `1..=count` is kept. Absent file yields the
/// empty set.
pub fn resolve_occupied(path: Option<&Path>, count: u32) -> BTreeSet<u32> {
    let mut occupied = BTreeSet::new();
    let Some(path) = path else {
        return occupied;
    };
    let contents = read_whole_file(path);
    for run in contents.split(|c: char| !c.is_ascii_digit()) {
        if run.is_empty() {
            continue;
        }
        if let Ok(id) = run.parse::<u32>() {
            if (1..=count).contains(&id) {
                occupied.insert(id);
            }
        }
    }
    occupied
}

/// Combine focused and occupied into a [`WorkspaceState`].
///
/// The focused workspace is forced into the occupied set so it is always
/// displayed, even before the occupancy file first exists.
pub fn finalize(focused: u32, mut occupied: BTreeSet<u32>) -> WorkspaceState {
    occupied.insert(focused);
    WorkspaceState { focused, occupied }
}

//  Tests
