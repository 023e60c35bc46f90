use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(json: bool) {
    JSON_MODE.store(json, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

/// Human-mode status line: a colored label followed by a message.
pub fn status(label: &str, msg: &str) {
    if is_json() {
        return;
    }
    let mut out = StandardStream::stdout(ColorChoice::Auto);
    let _ = out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = write!(out, "{label:>10}");
    let _ = out.reset();
    let _ = writeln!(out, " {msg}");
}
