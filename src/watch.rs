//! Filesystem change notification for the workspace state files.
//!
//! A thin inotify wrapper. The bar does not care *what* changed: any
//! event on a watched path means the workspace state must be re-read, so
//! [`FileWatch::drain`] simply empties the queue and reports whether
//! anything was there.

use log::{debug, warn};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;

/// A non-blocking inotify instance watching a fixed set of paths.
pub struct FileWatch {
    fd: RawFd,
}

impl FileWatch {
    /// Watch `paths` for modify/create/delete/move events.
    ///
    /// Paths that do not exist (yet) are skipped with a debug note; if
    /// nothing could be watched at all, `None` is returned and the bar
    /// falls back to tick-driven refresh.
    pub fn new<P: AsRef<Path>>(paths: &[P]) -> Option<FileWatch> {
        let fd = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if fd < 0 {
            warn!("inotify unavailable: {}", std::io::Error::last_os_error());
            return None;
        }

        let mask = libc::IN_MODIFY
            | libc::IN_CREATE
            | libc::IN_DELETE
            | libc::IN_MOVED_TO
            | libc::IN_MOVED_FROM;
        let mut watches = 0;
        for path in paths {
            let path = path.as_ref();
            let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
                continue;
            };
            let wd = unsafe { libc::inotify_add_watch(fd, cpath.as_ptr(), mask) };
            if wd < 0 {
                debug!("not watching {}: {}", path.display(), std::io::Error::last_os_error());
            } else {
                watches += 1;
            }
        }

        if watches == 0 {
            unsafe { libc::close(fd) };
            return None;
        }
        Some(FileWatch { fd })
    }

    /// The fd to include in the event loop's wait-set.
    pub fn poll_fd(&self) -> RawFd {
        self.fd
    }

    /// Empty the event queue. Returns whether any event was pending.
    pub fn drain(&self) -> bool {
        let mut any = false;
        let mut buf = [0u8; 1024];
        loop {
            let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n > 0 {
                any = true;
            } else {
                break;
            }
        }
        any
    }
}

impl Drop for FileWatch {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("xtagbar-watch-{}-{}", std::process::id(), id))
    }

    #[test]
    fn missing_paths_yield_no_watch() {
        let path = tmp_path();
        assert!(FileWatch::new(&[&path]).is_none());
    }

    #[test]
    fn modify_event_is_reported_once_then_quiet() {
        let path = tmp_path();
        std::fs::write(&path, "1").unwrap();
        let watch = FileWatch::new(&[&path]).expect("watch existing file");

        assert!(!watch.drain(), "no events before any change");

        std::fs::write(&path, "2").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(watch.drain(), "modification must be reported");
        assert!(!watch.drain(), "queue must be empty after draining");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn one_existing_path_is_enough() {
        let present = tmp_path();
        let absent = tmp_path();
        std::fs::write(&present, "x").unwrap();
        assert!(FileWatch::new(&[&present, &absent]).is_some());
        let _ = std::fs::remove_file(&present);
    }
}
