//! The Xlib/Xft rendering surface.
//!
//! [`X11Surface`] owns the display connection, the override-redirect dock
//! window, the Xft font, and every allocated color. It is the one place in
//! the crate that calls into X; all calls happen on the thread that created
//! it.
//!
//! Font loading is the single fatal failure in the program: without a
//! renderable font the bar cannot function, so [`X11Surface::new`] refuses
//! to construct and `main` exits. Color trouble merely degrades to
//! defaults.

use crate::color::{Palette, Rgb};
use crate::config::{Config, MIN_CONTENT_WIDTH};
use crate::traits::{FontMetrics, Paint, Surface, TextMeasure, UiEvent, WorkspacePort};
use crate::x11::ewmh;
use log::warn;
use std::ffi::CString;
use std::os::raw::{c_int, c_uint, c_ulong};
use std::os::unix::io::RawFd;
use x11::xft;
use x11::xlib;
use x11::xrender::{XGlyphInfo, XRenderColor};

/// Errors from bringing up the X11 backend.
#[derive(Debug, thiserror::Error)]
pub enum X11Error {
    #[error("cannot open display")]
    OpenDisplay,
    #[error("failed to open Xft font {name:?} (and fallbacks); set a valid fontconfig name")]
    FontOpen { name: String },
}

/// The bar's window and drawing state.
pub struct X11Surface {
    dpy: *mut xlib::Display,
    screen: c_int,
    root: xlib::Window,
    win: xlib::Window,
    font: *mut xft::XftFont,
    draw: *mut xft::XftDraw,
    gc_bg: xlib::GC,
    gc_focus: xlib::GC,
    xft_fg: xft::XftColor,
    xft_shadow: xft::XftColor,
    xft_focus_text: xft::XftColor,
}

impl X11Surface {
    /// Connect to the display and create the bar window.
    ///
    /// The window starts at the minimum width; the first frame resizes it.
    /// It is mapped raised, marked as a dock, and reserves `config.height`
    /// pixels of strut at the top of the screen.
    pub fn new(config: &Config, palette: &Palette) -> Result<X11Surface, X11Error> {
        unsafe {
            let dpy = xlib::XOpenDisplay(std::ptr::null());
            if dpy.is_null() {
                return Err(X11Error::OpenDisplay);
            }
            let screen = xlib::XDefaultScreen(dpy);
            let root = xlib::XRootWindow(dpy, screen);
            let cmap = xlib::XDefaultColormap(dpy, screen);
            let visual = xlib::XDefaultVisual(dpy, screen);

            let font = open_font_chain(dpy, screen, &config.font);
            let Some(font) = font else {
                xlib::XCloseDisplay(dpy);
                return Err(X11Error::FontOpen {
                    name: config.font.clone(),
                });
            };

            let bg_pixel = alloc_pixel(dpy, cmap, palette.background)
                .unwrap_or_else(|| xlib::XWhitePixel(dpy, screen));
            let focus_pixel = alloc_pixel(dpy, cmap, palette.focus)
                .unwrap_or_else(|| xlib::XBlackPixel(dpy, screen));

            let mut wa: xlib::XSetWindowAttributes = std::mem::zeroed();
            wa.override_redirect = xlib::True;
            wa.background_pixel = 0;
            wa.event_mask =
                xlib::ExposureMask | xlib::ButtonPressMask | xlib::StructureNotifyMask;
            let win = xlib::XCreateWindow(
                dpy,
                root,
                0,
                0,
                MIN_CONTENT_WIDTH as c_uint,
                config.height,
                0,
                xlib::XDefaultDepth(dpy, screen),
                xlib::InputOutput as c_uint,
                visual,
                xlib::CWOverrideRedirect | xlib::CWBackPixel | xlib::CWEventMask,
                &mut wa,
            );
            ewmh::set_dock_type(dpy, win);

            let gc_bg = xlib::XCreateGC(dpy, win, 0, std::ptr::null_mut());
            xlib::XSetForeground(dpy, gc_bg, bg_pixel);
            let gc_focus = xlib::XCreateGC(dpy, win, 0, std::ptr::null_mut());
            xlib::XSetForeground(dpy, gc_focus, focus_pixel);

            let draw = xft::XftDrawCreate(dpy, win, visual, cmap);
            let xft_fg = alloc_xft(dpy, visual, cmap, palette.foreground, 0xffff);
            let xft_shadow = alloc_xft(dpy, visual, cmap, palette.shadow, 0x8000);
            let xft_focus_text = alloc_xft(dpy, visual, cmap, palette.focus_text, 0xffff);

            xlib::XMapRaised(dpy, win);
            ewmh::set_strut(dpy, win, config.height);
            xlib::XSync(dpy, xlib::False);

            Ok(X11Surface {
                dpy,
                screen,
                root,
                win,
                font,
                draw,
                gc_bg,
                gc_focus,
                xft_fg,
                xft_shadow,
                xft_focus_text,
            })
        }
    }

    fn xft_color(&self, paint: Paint) -> &xft::XftColor {
        match paint {
            Paint::Shadow => &self.xft_shadow,
            Paint::FocusText => &self.xft_focus_text,
            _ => &self.xft_fg,
        }
    }

    fn gc(&self, paint: Paint) -> xlib::GC {
        match paint {
            Paint::Focus => self.gc_focus,
            _ => self.gc_bg,
        }
    }
}

impl TextMeasure for X11Surface {
    fn text_width(&self, text: &str) -> i32 {
        let mut info: XGlyphInfo = unsafe { std::mem::zeroed() };
        unsafe {
            xft::XftTextExtentsUtf8(
                self.dpy,
                self.font,
                text.as_ptr(),
                text.len() as c_int,
                &mut info,
            );
        }
        i32::from(info.xOff)
    }
}

impl Surface for X11Surface {
    fn screen_width(&self) -> i32 {
        unsafe { xlib::XDisplayWidth(self.dpy, self.screen) }
    }

    fn font_metrics(&self) -> FontMetrics {
        unsafe {
            FontMetrics {
                ascent: (*self.font).ascent,
                descent: (*self.font).descent,
            }
        }
    }

    fn move_resize(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe {
            xlib::XMoveResizeWindow(self.dpy, self.win, x, y, width.max(1), height.max(1));
            xlib::XSync(self.dpy, xlib::False);
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, paint: Paint) {
        unsafe {
            xlib::XFillRectangle(self.dpy, self.win, self.gc(paint), x, y, width, height);
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, paint: Paint) {
        if text.is_empty() {
            return;
        }
        unsafe {
            xft::XftDrawStringUtf8(
                self.draw,
                self.xft_color(paint),
                self.font,
                x,
                y,
                text.as_ptr(),
                text.len() as c_int,
            );
        }
    }

    fn flush(&mut self) {
        unsafe {
            xlib::XFlush(self.dpy);
        }
    }

    fn poll_fd(&self) -> RawFd {
        unsafe { xlib::XConnectionNumber(self.dpy) }
    }

    fn drain_events(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        unsafe {
            while xlib::XPending(self.dpy) > 0 {
                let mut ev: xlib::XEvent = std::mem::zeroed();
                xlib::XNextEvent(self.dpy, &mut ev);
                match ev.get_type() {
                    xlib::ButtonPress => events.push(UiEvent::Click { x: ev.button.x }),
                    xlib::ConfigureNotify => events.push(UiEvent::Reconfigured),
                    xlib::Expose if ev.expose.count == 0 => events.push(UiEvent::Exposed),
                    _ => {}
                }
            }
        }
        events
    }
}

impl WorkspacePort for X11Surface {
    fn current_workspace(&self) -> Option<u32> {
        let raw = unsafe { ewmh::current_desktop(self.dpy, self.root) }?;
        // EWMH desktops are 0-based on the wire.
        u32::try_from(raw + 1).ok().filter(|&ws| ws >= 1)
    }
}

impl Drop for X11Surface {
    fn drop(&mut self) {
        unsafe {
            xft::XftDrawDestroy(self.draw);
            xft::XftFontClose(self.dpy, self.font);
            xlib::XFreeGC(self.dpy, self.gc_bg);
            xlib::XFreeGC(self.dpy, self.gc_focus);
            xlib::XDestroyWindow(self.dpy, self.win);
            xlib::XCloseDisplay(self.dpy);
        }
    }
}

/// Try the configured font, then the compiled-in fallbacks.
unsafe fn open_font_chain(
    dpy: *mut xlib::Display,
    screen: c_int,
    configured: &str,
) -> Option<*mut xft::XftFont> {
    for name in [configured, "xterm-12", "monospace-12"] {
        let Ok(cname) = CString::new(name) else {
            continue;
        };
        let font = xft::XftFontOpenName(dpy, screen, cname.as_ptr());
        if !font.is_null() {
            return Some(font);
        }
        warn!("cannot open font {:?}", name);
    }
    None
}

/// Allocate a colormap pixel for `rgb`.
unsafe fn alloc_pixel(
    dpy: *mut xlib::Display,
    cmap: xlib::Colormap,
    rgb: Rgb,
) -> Option<c_ulong> {
    let mut xc: xlib::XColor = std::mem::zeroed();
    xc.red = u16::from(rgb.r) * 0x101;
    xc.green = u16::from(rgb.g) * 0x101;
    xc.blue = u16::from(rgb.b) * 0x101;
    if xlib::XAllocColor(dpy, cmap, &mut xc) != 0 {
        Some(xc.pixel)
    } else {
        warn!("cannot allocate color {:?}", rgb);
        None
    }
}

/// Allocate an Xft color, falling back to opaque black.
unsafe fn alloc_xft(
    dpy: *mut xlib::Display,
    visual: *mut xlib::Visual,
    cmap: xlib::Colormap,
    rgb: Rgb,
    alpha: u16,
) -> xft::XftColor {
    let rc = XRenderColor {
        red: u16::from(rgb.r) * 0x101,
        green: u16::from(rgb.g) * 0x101,
        blue: u16::from(rgb.b) * 0x101,
        alpha,
    };
    let mut out: xft::XftColor = std::mem::zeroed();
    if xft::XftColorAllocValue(dpy, visual, cmap, &rc, &mut out) == 0 {
        let fallback = XRenderColor {
            red: 0,
            green: 0,
            blue: 0,
            alpha: 0xffff,
        };
        xft::XftColorAllocValue(dpy, visual, cmap, &fallback, &mut out);
    }
    out
}
