//! Core traits that decouple the bar from X11 and from the shell.
//!
//! The event loop and layout engine only ever talk to these seams:
//!
//! * [`Surface`]: the rendering surface and its input-event stream.
//! * [`WorkspacePort`]: the desktop-session protocol, narrowed to the one
//!   query the bar needs ("which workspace is current?").
//! * [`CommandRunner`]: fire-and-forget shell invocation for workspace
//!   switching.
//!
//! The concrete implementations live in [`x11`](crate::x11) and
//! [`runner`](crate::runner); tests substitute recording fakes.

use std::os::unix::io::RawFd;

/// Vertical font extents, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub ascent: i32,
    pub descent: i32,
}

impl FontMetrics {
    /// Baseline y-position that vertically centers a line of text in a bar
    /// of the given height.
    pub fn baseline_in(&self, bar_height: u32) -> i32 {
        self.ascent + (bar_height as i32 - (self.ascent + self.descent)) / 2
    }
}

/// Which resolved color a draw call uses.
///
/// The surface owns the actual color values; callers only name the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Background,
    Foreground,
    /// Translucent contrasting shadow behind text.
    Shadow,
    /// Focus highlight fill.
    Focus,
    /// Text on top of the focus highlight.
    FocusText,
}

/// Input events drained from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// Pointer button press at window-relative x.
    Click { x: i32 },
    /// Screen or window geometry changed; layout must be recomputed.
    Reconfigured,
    /// Window contents need repainting.
    Exposed,
}

/// Text width measurement, split out of [`Surface`] so the pure layout
/// engine can depend on measurement alone.
pub trait TextMeasure {
    /// Horizontal advance of `text` in pixels.
    fn text_width(&self, text: &str) -> i32;
}

/// A rendering surface the bar draws frames onto.
///
/// All drawing happens between a [`move_resize`](Surface::move_resize) and a
/// [`flush`](Surface::flush); nothing is visible until the flush.
pub trait Surface: TextMeasure {
    /// Current width of the screen the surface lives on, in pixels.
    fn screen_width(&self) -> i32;

    /// Metrics of the surface's font.
    fn font_metrics(&self) -> FontMetrics;

    /// Move and resize the bar window.
    fn move_resize(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Fill a rectangle with the named paint.
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, paint: Paint);

    /// Draw text with its baseline at `(x, y)`.
    fn draw_text(&mut self, x: i32, y: i32, text: &str, paint: Paint);

    /// Push all pending drawing to the display.
    fn flush(&mut self);

    /// File descriptor that becomes readable when input events arrive.
    fn poll_fd(&self) -> RawFd;

    /// Drain every pending input event without blocking.
    fn drain_events(&mut self) -> Vec<UiEvent>;
}

/// The desktop-session protocol, narrowed to the single query the bar
/// needs when the focused-workspace file is absent or unparsable.
pub trait WorkspacePort {
    /// The current workspace, 1-based, or `None` if the protocol does not
    /// expose one.
    fn current_workspace(&self) -> Option<u32>;
}

/// Fire-and-forget shell invocation.
///
/// Injected into the event loop so tests can observe workspace-switch side
/// effects without running real commands.
pub trait CommandRunner {
    /// Run `command` through a shell, detached. No output or exit status is
    /// consumed.
    fn run_detached(&self, command: &str);
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_centers_text_vertically() {
        let m = FontMetrics { ascent: 12, descent: 4 };
        // 28px bar, 16px line: 6px of slack above the ascent.
        assert_eq!(m.baseline_in(28), 18);
    }

    #[test]
    fn baseline_in_tight_bar_stays_at_ascent() {
        let m = FontMetrics { ascent: 12, descent: 4 };
        assert_eq!(m.baseline_in(16), 12);
    }
}
