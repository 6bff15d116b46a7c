//! Shell command execution for side effects.
//!
//! Workspace switching is fire-and-forget: the bar formats a command,
//! hands it to the shell, and never looks at the result. [`ShellRunner`]
//! is the production [`CommandRunner`]; each spawned child is waited on
//! from a detached thread so no zombies accumulate.

use crate::traits::CommandRunner;
use log::{debug, warn};
use std::process::{Command, Stdio};

/// Runs commands through `sh -c`, detached.
#[derive(Debug, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run_detached(&self, command: &str) {
        if command.is_empty() {
            return;
        }
        debug!("running {:?}", command);
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => warn!("failed to run {:?}: {}", command, e),
        }
    }
}

/// Build the shell invocation that switches to workspace `ws`.
///
/// A configured template containing `%d` has the placeholder substituted
/// with the 1-based workspace id. Without a usable template, fall back to
/// `wmctrl` (which takes a 0-based desktop index) and, should that fail,
/// `xdotool` pressing super+N.
pub fn switch_invocation(template: Option<&str>, ws: u32) -> String {
    if let Some(fmt) = template {
        if fmt.contains("%d") {
            return fmt.replacen("%d", &ws.to_string(), 1);
        }
    }
    format!(
        "wmctrl -s {} >/dev/null 2>&1 || xdotool key super+{} >/dev/null 2>&1",
        ws - 1,
        ws % 10
    )
}

//  Tests
