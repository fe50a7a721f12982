use std::ffi::OsStr;

use current_platform::CURRENT_PLATFORM;
use strum::VariantArray;

use crate::{events::ExecutionEvent, logging::LOG_ENV};

/// Environment variable pointing at a TOML settings file.
pub const CONFIG_ENV: &str = "MAGICK_TOOLKIT_CONFIG";

pub fn maybe_print_help_and_exit(bin_name: &str) {
    match std::env::args_os().nth(1) {
        None => print_help_and_exit(bin_name),
        Some(arg) => {
            if arg.as_os_str() == OsStr::new("--help") || arg.as_os_str() == OsStr::new("-help") {
                print_help_and_exit(bin_name)
            }
        }
    }
}

fn print_help_and_exit(bin_name: &str) -> ! {
    print!("{}", help_text(bin_name));
    std::process::exit(0);
}

pub fn help_text(bin_name: &str) -> String {
    let mut text = String::new();
    text.push_str(&format!("Version: {}\n", version_string()));
    text.push_str(&format!("License: {}\n", env!("CARGO_PKG_LICENSE")));
    text.push_str(&format!(
        "Usage: {bin_name} source [options ...] destination\n\n"
    ));
    text.push_str("Every option is passed to convert as written, after the source image.\n\n");
    text.push_str("Environment:\n");
    text.push_str(&format!("  {CONFIG_ENV:22} TOML settings file\n"));
    text.push_str(&format!("  {LOG_ENV:22} log filter, e.g. debug\n\n"));
    text.push_str("Execution events:\n");
    for event in ExecutionEvent::VARIANTS {
        let name: &'static str = event.into();
        text.push_str(&format!("  {name}\n"));
    }
    text
}

pub fn version_string() -> String {
    let cpu = CURRENT_PLATFORM.split('-').next().unwrap_or("unknown");
    let version = env!("CARGO_PKG_VERSION");
    format!("magick-toolkit {version} {cpu}")
}
