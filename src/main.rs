//! Entry point for the **xtagbar** binary.
//!
//! Loads the configuration (JSON file, then `XTAGBAR_*` environment
//! overrides), brings up the X11 backend, and hands control to the event
//! loop. The only fatal startup conditions are an unreachable display and
//! an unopenable font; everything else degrades and is logged.

use log::{error, info};
use xtagbar::bar::Bar;
use xtagbar::color::Palette;
use xtagbar::config::Config;
use xtagbar::runner::ShellRunner;
use xtagbar::x11::X11Surface;

/// Resolve the config directory (`$XDG_CONFIG_HOME/xtagbar`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("xtagbar")
}

/// Try to load `$XDG_CONFIG_HOME/xtagbar/config.json`, falling back to
/// compiled-in defaults, then apply environment overrides on top.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    let config = match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    };
    config.with_env_overrides()
}

fn main() {
    env_logger::init();

    let config = load_config();
    let palette = Palette::resolve(&config.background, &config.foreground, &config.focus);

    let backend = match X11Surface::new(&config, &palette) {
        Ok(surface) => surface,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut bar = Bar::new(config, backend, ShellRunner::new());
    if let Err(e) = bar.run() {
        error!("event loop failed: {}", e);
        std::process::exit(1);
    }
}
