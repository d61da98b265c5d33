//! Terminal output utilities

use console::style;
use goobi_exchange_dump::{Message, Severity};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Print one run message by severity
pub fn message(message: &Message) {
    match message.severity {
        Severity::Ok => println!("  {} {}", style("OK").green(), message.text),
        Severity::Warning => warning(&message.text),
        Severity::Error => error(&message.text),
    }
}
