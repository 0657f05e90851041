use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    Mac,
    #[default]
    Other,
}

impl Platform {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("mac") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }

    fn command_key(self) -> &'static str {
        match self {
            Platform::Mac => "⌘",
            Platform::Other => "Ctrl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    SingleLine,
    MultiLine,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionMessage {
    pub text: String,
    pub blink: bool,
}

/// Hint line shown under a focused text-like control.
#[derive(Debug, Clone, Copy)]
pub struct InputInstructions<'a> {
    pub dirty: bool,
    pub value: &'a str,
    pub in_form: bool,
    pub max_length: Option<usize>,
    pub kind: InputKind,
    pub allow_enter_to_submit: bool,
    pub platform: Platform,
}

impl InputInstructions<'_> {
    pub fn messages(&self) -> Vec<InstructionMessage> {
        let mut messages = Vec::new();

        if self.allow_enter_to_submit {
            let action = if self.in_form { "submit form" } else { "apply" };
            let text = match self.kind {
                InputKind::MultiLine => {
                    format!("Press {}+Enter to {action}", self.platform.command_key())
                }
                InputKind::SingleLine => format!("Press Enter to {action}"),
            };
            messages.push(InstructionMessage { text, blink: false });
        }

        if let Some(max_length) = self.max_length {
            let length = self.value.chars().count();
            messages.push(InstructionMessage {
                text: format!("{length}/{max_length}"),
                blink: self.dirty && length >= max_length,
            });
        }

        messages
    }
}
