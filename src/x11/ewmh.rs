//! EWMH property plumbing for the bar window.
//!
//! Three concerns: advertise the window as a dock, reserve screen space at
//! the top via struts, and read `_NET_CURRENT_DESKTOP` as the fallback
//! focused-workspace source.

use std::os::raw::{c_char, c_int, c_long, c_uchar, c_ulong};
use x11::xlib;

/// Intern an atom from a NUL-terminated byte literal.
unsafe fn intern(dpy: *mut xlib::Display, name: &[u8]) -> xlib::Atom {
    xlib::XInternAtom(dpy, name.as_ptr() as *const c_char, xlib::False)
}

/// Mark `win` as a dock so the window manager keeps it undecorated and
/// above tiled windows.
pub unsafe fn set_dock_type(dpy: *mut xlib::Display, win: xlib::Window) {
    let a_type = intern(dpy, b"_NET_WM_WINDOW_TYPE\0");
    let a_dock = intern(dpy, b"_NET_WM_WINDOW_TYPE_DOCK\0");
    if a_type == 0 || a_dock == 0 {
        return;
    }
    xlib::XChangeProperty(
        dpy,
        win,
        a_type,
        xlib::XA_ATOM,
        32,
        xlib::PropModeReplace,
        &a_dock as *const xlib::Atom as *const c_uchar,
        1,
    );
}

/// Reserve `top` pixels at the top of the screen.
pub unsafe fn set_strut(dpy: *mut xlib::Display, win: xlib::Window, top: u32) {
    let a_strut = intern(dpy, b"_NET_WM_STRUT\0");
    let a_partial = intern(dpy, b"_NET_WM_STRUT_PARTIAL\0");
    if a_strut == 0 || a_partial == 0 {
        return;
    }
    let strut: [c_long; 4] = [0, 0, c_long::from(top), 0];
    let mut partial: [c_long; 12] = [0; 12];
    partial[2] = c_long::from(top);
    xlib::XChangeProperty(
        dpy,
        win,
        a_strut,
        xlib::XA_CARDINAL,
        32,
        xlib::PropModeReplace,
        strut.as_ptr() as *const c_uchar,
        4,
    );
    xlib::XChangeProperty(
        dpy,
        win,
        a_partial,
        xlib::XA_CARDINAL,
        32,
        xlib::PropModeReplace,
        partial.as_ptr() as *const c_uchar,
        12,
    );
}

/// Read `_NET_CURRENT_DESKTOP` from the root window.
///
/// Returns the raw 0-based desktop index, or `None` when the property is
/// absent (no EWMH window manager running).
pub unsafe fn current_desktop(dpy: *mut xlib::Display, root: xlib::Window) -> Option<i64> {
    let atom = intern(dpy, b"_NET_CURRENT_DESKTOP\0");
    if atom == 0 {
        return None;
    }
    let mut actual_type: xlib::Atom = 0;
    let mut actual_format: c_int = 0;
    let mut nitems: c_ulong = 0;
    let mut bytes_after: c_ulong = 0;
    let mut data: *mut c_uchar = std::ptr::null_mut();
    let status = xlib::XGetWindowProperty(
        dpy,
        root,
        atom,
        0,
        1,
        xlib::False,
        xlib::AnyPropertyType as xlib::Atom,
        &mut actual_type,
        &mut actual_format,
        &mut nitems,
        &mut bytes_after,
        &mut data,
    );
    if status != 0 || data.is_null() {
        return None;
    }
    let value = if nitems >= 1 {
        Some(*(data as *const c_long) as i64)
    } else {
        None
    };
    xlib::XFree(data as *mut std::ffi::c_void);
    value
}
