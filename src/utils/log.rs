// src/utils/log.rs

//! Run-report helpers on top of the `log` facade.
//!
//! Headers and summaries are emitted at INFO so they show up in the default
//! log stream next to regular messages.

/// Width of header borders.
const RULE_WIDTH: usize = 60;

/// Log a bordered header.
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log an indented sub-item.
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        sub_item(&format!("{key}: {value}"));
    }
}
