//! Service layer for the slot watcher.
//!
//! This module contains the business logic for:
//! - Record extraction from page markup (`RecordExtractor`)
//! - Alert rendering (`NotificationFormatter`)
//! - Page acquisition (`PageSource`, `HttpPageSource`, `FilePageSource`)
//! - Message delivery (`Notifier`, `TelegramNotifier`)

mod extractor;
mod formatter;
mod page;
mod telegram;

pub use extractor::RecordExtractor;
pub use formatter::NotificationFormatter;
pub use page::{FilePageSource, HttpPageSource, PageSource};
pub use telegram::{Notifier, OutboundMessage, TelegramNotifier};
