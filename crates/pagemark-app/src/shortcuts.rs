//! Keyboard shortcut registry and documentation.

use pagemark_core::{Modifiers, ToolKind};

/// What a shortcut does once matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Undo,
    Redo,
    SelectTool(ToolKind),
    /// Drop the stroke in progress.
    CancelStroke,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub command: Command,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        command: Command,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            alt,
            command,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Shift+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    /// Whether `key` pressed with `modifiers` triggers this shortcut.
    /// Ctrl and Cmd are interchangeable.
    pub fn matches(&self, key: &str, modifiers: Modifiers) -> bool {
        self.key.eq_ignore_ascii_case(key)
            && self.ctrl == modifiers.command()
            && self.shift == modifiers.shift
            && self.alt == modifiers.alt
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        let select = Command::SelectTool;
        vec![
            Shortcut::new("Z", true, false, false, Command::Undo, "Undo"),
            Shortcut::new("Z", true, true, false, Command::Redo, "Redo"),
            Shortcut::new("Y", true, false, false, Command::Redo, "Redo"),
            Shortcut::new("1", false, false, true, select(ToolKind::Text), "Text tool"),
            Shortcut::new("2", false, false, true, select(ToolKind::FineLiner), "Fine liner"),
            Shortcut::new("3", false, false, true, select(ToolKind::Pen), "Pen"),
            Shortcut::new("4", false, false, true, select(ToolKind::Marker), "Marker"),
            Shortcut::new("5", false, false, true, select(ToolKind::Highlighter), "Highlighter"),
            Shortcut::new("6", false, false, true, select(ToolKind::Eraser), "Eraser"),
            Shortcut::new("7", false, false, true, select(ToolKind::Shape), "Shape tool"),
            Shortcut::new("Escape", false, false, false, Command::CancelStroke, "Cancel stroke"),
        ]
    }

    /// Find the command bound to `key` with `modifiers`.
    pub fn lookup(key: &str, modifiers: Modifiers) -> Option<Command> {
        Self::all()
            .into_iter()
            .find(|s| s.matches(key, modifiers))
            .map(|s| s.command)
    }

    /// Print all shortcuts to console.
    pub fn print_all() {
        println!("\n=== Keyboard Shortcuts ===");
        for shortcut in Self::all() {
            println!("  {:20} {}", shortcut.format(), shortcut.description);
        }
        println!("  {:20} {}", "Shift+Drag", "Straight line with freehand tools");
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, ..Modifiers::NONE }
    }

    #[test]
    fn test_undo_redo_bindings() {
        assert_eq!(ShortcutRegistry::lookup("z", ctrl()), Some(Command::Undo));
        let ctrl_shift = Modifiers { shift: true, ..ctrl() };
        assert_eq!(ShortcutRegistry::lookup("Z", ctrl_shift), Some(Command::Redo));
        assert_eq!(ShortcutRegistry::lookup("y", ctrl()), Some(Command::Redo));

        // Cmd works like Ctrl
        let meta = Modifiers { meta: true, ..Modifiers::NONE };
        assert_eq!(ShortcutRegistry::lookup("z", meta), Some(Command::Undo));
    }

    #[test]
    fn test_plain_keys_are_not_shortcuts() {
        assert_eq!(ShortcutRegistry::lookup("z", Modifiers::NONE), None);
        assert_eq!(ShortcutRegistry::lookup("3", Modifiers::NONE), None);
    }

    #[test]
    fn test_tool_bindings_cover_every_tool() {
        let alt = Modifiers { alt: true, ..Modifiers::NONE };
        for (i, tool) in ToolKind::ALL.iter().enumerate() {
            let key = (i + 1).to_string();
            assert_eq!(ShortcutRegistry::lookup(&key, alt), Some(Command::SelectTool(*tool)));
        }
    }

    #[test]
    fn test_format() {
        let redo = Shortcut::new("Z", true, true, false, Command::Redo, "Redo");
        assert_eq!(redo.format(), "Ctrl+Shift+Z");
    }
}
