pub mod console;
pub mod notifier;
pub mod telegram;

pub use console::ConsoleNotifier;
pub use notifier::{Notifier, NotifyResult};
pub use telegram::{TelegramClient, TelegramNotifier, Update};
