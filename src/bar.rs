//! The event loop that drives the bar.
//!
//! [`Bar`] ties everything together: it owns the supervised status
//! commands, the filesystem watch, and the last frame's hit-test table,
//! and multiplexes all of their readiness into a single `poll(2)` wait.
//!
//! One iteration:
//!
//! 1. Supervisors whose restart deadline has elapsed are respawned
//!    immediately; a spawn forces a redraw and skips the wait entirely
//!    (restart takes priority over waiting).
//! 2. Otherwise the wait-set is rebuilt from the currently-live fds (the
//!    display connection always, the inotify fd if available, each child
//!    pipe only while its supervisor is running) and polled with a small
//!    bounded timeout.
//! 3. Readiness is dispatched in a fixed order: display events, then the
//!    filesystem watch, then child pipes. A plain timeout advances the
//!    periodic-redraw counter instead.
//! 4. A single dirty flag collects every trigger so each iteration redraws
//!    at most once: resolve workspace state, compute the layout, render.
//!
//! Nothing in the loop blocks except the poll itself.

use crate::config::{Config, MAX_TEXT, TICK_MS};
use crate::layout::{self, LayoutParams, RenderFrame, TagRect};
use crate::runner;
use crate::supervisor::{ProcessSupervisor, ReadOutcome};
use crate::traits::{CommandRunner, Paint, Surface, UiEvent, WorkspacePort};
use crate::watch::FileWatch;
use crate::workspace;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Unrecoverable event-loop failure.
#[derive(Debug, thiserror::Error)]
pub enum BarError {
    #[error("poll failed: {0}")]
    Poll(#[from] std::io::Error),
}

/// Which wait-set slot became ready.
#[derive(Debug, Clone, Copy)]
enum Source {
    Display,
    Watch,
    Status,
    Right(usize),
}

/// The status bar: state, supervised children, and the event loop.
///
/// Generic over the backend (rendering surface + workspace protocol) and
/// the command runner, so tests can substitute recording fakes for both.
pub struct Bar<B: Surface + WorkspacePort, R: CommandRunner> {
    config: Config,
    backend: B,
    runner: R,
    status: ProcessSupervisor,
    right: Vec<ProcessSupervisor>,
    watch: Option<FileWatch>,
    /// Hit-test table from the last computed frame.
    tags: Vec<TagRect>,
}

impl<B: Surface + WorkspacePort, R: CommandRunner> Bar<B, R> {
    /// Build a bar. No children are spawned yet; the event loop's restart
    /// path performs the initial spawns on its first iteration.
    pub fn new(config: Config, backend: B, runner: R) -> Self {
        let status =
            ProcessSupervisor::new(config.status_command.clone(), config.interval(), MAX_TEXT);
        let right = config
            .right_commands
            .iter()
            .map(|cmd| ProcessSupervisor::new(cmd.clone(), config.interval(), MAX_TEXT))
            .collect();

        let watch_paths: Vec<PathBuf> = [&config.focused_path, &config.occupied_path]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        let watch = FileWatch::new(&watch_paths);
        if watch.is_none() {
            info!("no workspace files watched; relying on periodic refresh");
        }

        Self {
            config,
            backend,
            runner,
            status,
            right,
            watch,
            tags: Vec::new(),
        }
    }

    /// Run the event loop. Only returns on an unrecoverable poll error.
    pub fn run(&mut self) -> Result<(), BarError> {
        info!(
            "bar running: {} workspaces, {} right module(s)",
            self.config.workspaces,
            self.right.len()
        );
        self.redraw();

        let interval_ms = self.config.interval().as_millis() as i64;
        let mut tick_accum_ms: i64 = 0;

        loop {
            // Restart fast path: an elapsed deadline spawns now and skips
            // the wait this iteration.
            let now = Instant::now();
            let mut spawned = self.status.maybe_restart(now);
            for sup in &mut self.right {
                spawned |= sup.maybe_restart(now);
            }
            if spawned {
                self.redraw();
                tick_accum_ms = 0;
                continue;
            }

            // Wait-set over currently-live sources, rebuilt every time.
            let mut fds: Vec<libc::pollfd> = Vec::with_capacity(3 + self.right.len());
            let mut sources: Vec<Source> = Vec::with_capacity(fds.capacity());
            let mut push = |fd, source| {
                fds.push(libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                });
                sources.push(source);
            };
            push(self.backend.poll_fd(), Source::Display);
            if let Some(watch) = &self.watch {
                push(watch.poll_fd(), Source::Watch);
            }
            if let Some(fd) = self.status.output_fd() {
                push(fd, Source::Status);
            }
            for (i, sup) in self.right.iter().enumerate() {
                if let Some(fd) = sup.output_fd() {
                    push(fd, Source::Right(i));
                }
            }

            let ret =
                unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, TICK_MS) };

            let mut dirty = false;
            if ret > 0 {
                let now = Instant::now();
                for (pfd, source) in fds.iter().zip(&sources) {
                    if pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) == 0 {
                        continue;
                    }
                    match *source {
                        Source::Display => {
                            let events = self.backend.drain_events();
                            dirty |= self.dispatch_ui(events);
                        }
                        Source::Watch => {
                            if let Some(watch) = &self.watch {
                                if watch.drain() {
                                    debug!("workspace files changed");
                                    dirty = true;
                                }
                            }
                        }
                        Source::Status => dirty |= service_child(&mut self.status, now),
                        Source::Right(i) => dirty |= service_child(&mut self.right[i], now),
                    }
                }
            } else if ret == 0 {
                tick_accum_ms += i64::from(TICK_MS);
                if tick_accum_ms >= interval_ms {
                    tick_accum_ms = 0;
                    dirty = true;
                }
            } else {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EINTR) {
                    continue;
                }
                return Err(BarError::Poll(err));
            }

            if dirty {
                self.redraw();
                tick_accum_ms = 0;
            }
        }
    }

    /// Handle drained input events. Returns whether a redraw is due.
    fn dispatch_ui(&mut self, events: Vec<UiEvent>) -> bool {
        let mut dirty = false;
        for event in events {
            match event {
                UiEvent::Click { x } => {
                    if let Some(ws) = layout::hit_test(&self.tags, x) {
                        let cmd = runner::switch_invocation(
                            self.config.switch_command.as_deref(),
                            ws,
                        );
                        debug!("click on tag {}: {:?}", ws, cmd);
                        self.runner.run_detached(&cmd);
                        dirty = true;
                    }
                }
                UiEvent::Reconfigured | UiEvent::Exposed => dirty = true,
            }
        }
        dirty
    }

    /// Recompute state and layout, then render one frame.
    fn redraw(&mut self) {
        let focused = workspace::resolve_focused(
            self.config.focused_path.as_deref(),
            &self.backend,
            self.config.workspaces,
        );
        let occupied =
            workspace::resolve_occupied(self.config.occupied_path.as_deref(), self.config.workspaces);
        let state = workspace::finalize(focused, occupied);

        let right_text = join_modules(self.right.iter().map(ProcessSupervisor::current_line));
        let params = LayoutParams {
            screen_width: self.backend.screen_width(),
            bar_height: self.config.height,
            fullscreen: self.config.fullscreen,
        };
        let frame = layout::compute(
            &state,
            self.status.current_line(),
            &right_text,
            params,
            &self.backend,
        );
        self.tags = frame.tags.clone();
        render(&mut self.backend, &frame);
    }
}

/// Drain a readable child pipe. Returns whether anything changed.
fn service_child(sup: &mut ProcessSupervisor, now: Instant) -> bool {
    let mut dirty = false;
    loop {
        match sup.poll_readable(now) {
            ReadOutcome::Data => dirty = true,
            ReadOutcome::Eof | ReadOutcome::IoError => {
                dirty = true;
                break;
            }
            ReadOutcome::WouldBlock => break,
        }
    }
    dirty
}

/// Join right-module outputs with the fixed two-space separator, in
/// configured order, skipping modules that have not produced a line yet.
fn join_modules<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines.filter(|l| !l.is_empty()).collect::<Vec<_>>().join("  ")
}

/// Draw a computed frame onto the surface.
fn render<S: Surface>(surface: &mut S, frame: &RenderFrame) {
    use crate::config::TAG_PADDING;

    surface.move_resize(frame.window_x, 0, frame.content_width.max(1) as u32, frame.height);
    surface.fill_rect(0, 0, frame.content_width.max(1) as u32, frame.height, Paint::Background);

    let metrics = surface.font_metrics();
    let text_y = metrics.baseline_in(frame.height);
    let line_height = metrics.ascent + metrics.descent;

    for tag in &frame.tags {
        let label = tag.workspace.to_string();
        if tag.focused {
            let ry = ((frame.height as i32 - line_height) / 2 - 2).max(0);
            surface.fill_rect(
                tag.x - 2,
                ry,
                (tag.width + 4) as u32,
                (line_height + 4) as u32,
                Paint::Focus,
            );
            surface.draw_text(tag.x + TAG_PADDING / 2, text_y, &label, Paint::FocusText);
        } else {
            surface.draw_text(tag.x + TAG_PADDING / 2, text_y, &label, Paint::Foreground);
        }
    }

    surface.draw_text(frame.status_x + 1, text_y + 1, &frame.status_text, Paint::Shadow);
    surface.draw_text(frame.status_x, text_y, &frame.status_text, Paint::Foreground);
    surface.draw_text(frame.right_x + 1, text_y + 1, &frame.right_text, Paint::Shadow);
    surface.draw_text(frame.right_x, text_y, &frame.right_text, Paint::Foreground);
    surface.flush();
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{FontMetrics, TextMeasure};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_file(contents: &str) -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "xtagbar-bar-{}-{}.workspace",
            std::process::id(),
            id
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    //  Recording fakes

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        MoveResize { x: i32, w: u32 },
        FillRect { paint: Paint },
        DrawText { text: String, paint: Paint },
        Flush,
    }

    #[derive(Default)]
    struct MockBackend {
        ops: RefCell<Vec<Op>>,
        current: Option<u32>,
    }

    impl TextMeasure for MockBackend {
        fn text_width(&self, text: &str) -> i32 {
            text.chars().count() as i32 * 10
        }
    }

    impl Surface for MockBackend {
        fn screen_width(&self) -> i32 {
            1920
        }
        fn font_metrics(&self) -> FontMetrics {
            FontMetrics { ascent: 12, descent: 4 }
        }
        fn move_resize(&mut self, x: i32, _y: i32, w: u32, _h: u32) {
            self.ops.borrow_mut().push(Op::MoveResize { x, w });
        }
        fn fill_rect(&mut self, _x: i32, _y: i32, _w: u32, _h: u32, paint: Paint) {
            self.ops.borrow_mut().push(Op::FillRect { paint });
        }
        fn draw_text(&mut self, _x: i32, _y: i32, text: &str, paint: Paint) {
            if !text.is_empty() {
                self.ops.borrow_mut().push(Op::DrawText {
                    text: text.into(),
                    paint,
                });
            }
        }
        fn flush(&mut self) {
            self.ops.borrow_mut().push(Op::Flush);
        }
        fn poll_fd(&self) -> std::os::unix::io::RawFd {
            -1
        }
        fn drain_events(&mut self) -> Vec<UiEvent> {
            Vec::new()
        }
    }

    impl WorkspacePort for MockBackend {
        fn current_workspace(&self) -> Option<u32> {
            self.current
        }
    }

    #[derive(Default, Clone)]
    struct RecordingRunner {
        commands: Rc<RefCell<Vec<String>>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run_detached(&self, command: &str) {
            self.commands.borrow_mut().push(command.to_string());
        }
    }

    fn test_config(focused: &str, occupied: &str) -> (Config, PathBuf, PathBuf) {
        let focused_path = tmp_file(focused);
        let occupied_path = tmp_file(occupied);
        let mut config = Config::default();
        config.workspaces = 9;
        config.status_command = "true".into();
        config.focused_path = Some(focused_path.clone());
        config.occupied_path = Some(occupied_path.clone());
        (config, focused_path, occupied_path)
    }

    #[test]
    fn redraw_renders_occupied_tags_with_focus() {
        let (config, f, o) = test_config("4\n", "2,4");
        let mut bar = Bar::new(config, MockBackend::default(), RecordingRunner::default());
        bar.redraw();

        let ids: Vec<u32> = bar.tags.iter().map(|t| t.workspace).collect();
        assert_eq!(ids, vec![2, 4]);
        assert!(bar.tags[1].focused);

        let ops = bar.backend.ops.borrow();
        // Background fill, one focus highlight, labels "2" and "4", a flush.
        assert_eq!(ops[1], Op::FillRect { paint: Paint::Background });
        assert!(ops.contains(&Op::FillRect { paint: Paint::Focus }));
        assert!(ops.contains(&Op::DrawText { text: "2".into(), paint: Paint::Foreground }));
        assert!(ops.contains(&Op::DrawText { text: "4".into(), paint: Paint::FocusText }));
        assert_eq!(*ops.last().unwrap(), Op::Flush);
        drop(ops);

        let _ = std::fs::remove_file(f);
        let _ = std::fs::remove_file(o);
    }

    #[test]
    fn redraw_falls_back_to_protocol_focus() {
        let (mut config, f, o) = test_config("", "1");
        config.focused_path = None;
        let backend = MockBackend {
            current: Some(3),
            ..Default::default()
        };
        let mut bar = Bar::new(config, backend, RecordingRunner::default());
        bar.redraw();
        let focused: Vec<u32> = bar
            .tags
            .iter()
            .filter(|t| t.focused)
            .map(|t| t.workspace)
            .collect();
        assert_eq!(focused, vec![3]);

        let _ = std::fs::remove_file(f);
        let _ = std::fs::remove_file(o);
    }

    #[test]
    fn click_on_tag_runs_switch_command() {
        let (mut config, f, o) = test_config("4", "2,4");
        config.switch_command = Some("wm-switch %d".into());
        let runner = RecordingRunner::default();
        let mut bar = Bar::new(config, MockBackend::default(), runner.clone());
        bar.redraw();

        let tag = bar.tags[0];
        let dirty = bar.dispatch_ui(vec![UiEvent::Click { x: tag.x + 1 }]);
        assert!(dirty);
        assert_eq!(*runner.commands.borrow(), vec!["wm-switch 2"]);

        let _ = std::fs::remove_file(f);
        let _ = std::fs::remove_file(o);
    }

    #[test]
    fn click_outside_tags_is_ignored() {
        let (config, f, o) = test_config("1", "1");
        let runner = RecordingRunner::default();
        let mut bar = Bar::new(config, MockBackend::default(), runner.clone());
        bar.redraw();

        let dirty = bar.dispatch_ui(vec![UiEvent::Click { x: 5000 }]);
        assert!(!dirty);
        assert!(runner.commands.borrow().is_empty());

        let _ = std::fs::remove_file(f);
        let _ = std::fs::remove_file(o);
    }

    #[test]
    fn reconfigure_marks_dirty_without_side_effects() {
        let (config, f, o) = test_config("1", "");
        let runner = RecordingRunner::default();
        let mut bar = Bar::new(config, MockBackend::default(), runner.clone());
        assert!(bar.dispatch_ui(vec![UiEvent::Reconfigured]));
        assert!(bar.dispatch_ui(vec![UiEvent::Exposed]));
        assert!(runner.commands.borrow().is_empty());

        let _ = std::fs::remove_file(f);
        let _ = std::fs::remove_file(o);
    }

    #[test]
    fn join_modules_skips_silent_ones() {
        assert_eq!(join_modules(["", "vol 40%", "", "bat 80%"].into_iter()), "vol 40%  bat 80%");
        assert_eq!(join_modules(["", ""].into_iter()), "");
        assert_eq!(join_modules(std::iter::empty()), "");
    }
}
