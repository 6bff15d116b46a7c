//! Bar geometry computation.
//!
//! [`compute`] is a pure function from workspace state, module texts, and
//! measured glyph widths to a [`RenderFrame`]: window placement plus draw
//! positions for every element. It performs no I/O and owns no state, so
//! identical inputs always produce identical geometry.
//!
//! Overlong text is never truncated; clamping only moves the draw origin,
//! so glyphs are cropped by the window edge rather than cut mid-string.

use crate::config::{MIN_CONTENT_WIDTH, PADDING, TAG_PADDING, TAG_SPACING};
use crate::traits::TextMeasure;
use crate::workspace::WorkspaceState;

/// One clickable workspace tag, window-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRect {
    pub x: i32,
    pub width: i32,
    /// 1-based workspace id this tag represents.
    pub workspace: u32,
    /// Whether to draw the focus highlight behind it.
    pub focused: bool,
}

/// Everything the surface needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Screen x of the window's left edge.
    pub window_x: i32,
    /// Window (= content) width.
    pub content_width: i32,
    /// Bar height.
    pub height: u32,
    /// Tags in ascending workspace order; also next frame's hit-test table.
    pub tags: Vec<TagRect>,
    pub status_text: String,
    pub status_x: i32,
    pub right_text: String,
    pub right_x: i32,
}

/// Inputs to [`compute`] that are not measured text.
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    pub screen_width: i32,
    pub bar_height: u32,
    pub fullscreen: bool,
}

/// Compute window geometry and draw positions for one frame.
pub fn compute(
    state: &WorkspaceState,
    status_text: &str,
    right_text: &str,
    params: LayoutParams,
    measure: &impl TextMeasure,
) -> RenderFrame {
    // Tags, left to right in ascending workspace order.
    let mut x = PADDING;
    let mut tags = Vec::with_capacity(state.occupied.len());
    for &ws in &state.occupied {
        let width = measure.text_width(&ws.to_string()) + TAG_PADDING;
        tags.push(TagRect {
            x,
            width,
            workspace: ws,
            focused: ws == state.focused,
        });
        x += width + TAG_SPACING;
    }
    let left_width = x;

    let status_width = measure.text_width(status_text);
    let right_width = measure.text_width(right_text);

    let mut content_width = left_width + status_width + right_width + 3 * PADDING;
    if content_width < MIN_CONTENT_WIDTH {
        content_width = MIN_CONTENT_WIDTH;
    }

    let window_x;
    if params.fullscreen {
        content_width = params.screen_width;
        window_x = 0;
    } else {
        window_x = ((params.screen_width - content_width) / 2).max(0);
    }

    // Right text flush against the right padding, but never into the tags.
    let gap_start = left_width + PADDING;
    let right_x = (content_width - PADDING - right_width).max(gap_start);

    // Status centered in the gap between the tags and the right region;
    // when it does not fit, left-aligned at the gap start.
    let gap_end = right_x - PADDING;
    let gap = gap_end - gap_start;
    let centered = if status_width < gap {
        gap_start + (gap - status_width) / 2
    } else {
        gap_start
    };
    let status_x = centered.clamp(0, content_width);

    RenderFrame {
        window_x,
        content_width,
        height: params.bar_height,
        tags,
        status_text: status_text.to_string(),
        status_x,
        right_text: right_text.to_string(),
        right_x,
    }
}

/// Find the workspace whose tag contains window-relative `x`, if any.
pub fn hit_test(tags: &[TagRect], x: i32) -> Option<u32> {
    tags.iter()
        .find(|t| x >= t.x && x < t.x + t.width)
        .map(|t| t.workspace)
}

//  Tests
