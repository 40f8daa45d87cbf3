//! Pagemark Application
//!
//! The editing session that ties tools, the raster surface, history and
//! annotations together, plus keyboard shortcuts and the scripted driver.

mod script;
mod session;
mod shortcuts;

pub use script::{Script, ScriptError, ScriptRunner, ScriptStep};
pub use session::{EditorSession, SessionError};
pub use shortcuts::{Command, Shortcut, ShortcutRegistry};
