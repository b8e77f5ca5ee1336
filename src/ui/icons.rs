//! Shared UI icons and emojis.

use console::Emoji;

// Level state
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static LOCK: Emoji<'_, '_> = Emoji("🔒 ", "[LOCKED] ");
pub static PLAY: Emoji<'_, '_> = Emoji("▶️  ", "[>] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

// Stage content
pub static SPEECH: Emoji<'_, '_> = Emoji("💬 ", "> ");
pub static BOOK: Emoji<'_, '_> = Emoji("📖 ", "");
pub static PENCIL: Emoji<'_, '_> = Emoji("📝 ", "");
pub static TROPHY: Emoji<'_, '_> = Emoji("🏆 ", "*");
