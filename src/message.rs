//! Append-only message log with tail coalescing. Each entry carries a color
//! atom and a repeat counter alongside its text, rather than a flat
//! `Vec<String>`.

use serde::{Deserialize, Serialize};

/// Named palette entries used by messages. The
/// renderer collaborator maps these to RGB triplets; the engine only ever
/// needs the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Impossible,
    PlayerAtk,
    EnemyAtk,
    PlayerDie,
    EnemyDie,
    HealthRecovered,
    StatusEffectApplied,
    WelcomeText,
    MenuText,
    MenuTitle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub fg: Color,
    pub count: u32,
}

impl Message {
    /// `text` with a ` (xN)` suffix when `count > 1`.
    pub fn full_text(&self) -> String {
        if self.count > 1 {
            format!("{} (x{})", self.text, self.count)
        } else {
            self.text.clone()
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    /// Appends `text`, or increments the tail's counter if it repeats the
    /// previous message verbatim.
    pub fn add(&mut self, text: impl Into<String>, fg: Color) {
        let text = text.into();
        if let Some(last) = self.messages.last_mut() {
            if last.text == text && last.fg == fg {
                last.count += 1;
                return;
            }
        }
        self.messages.push(Message { text, fg, count: 1 });
    }

    pub fn lines(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
