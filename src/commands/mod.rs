pub mod dispatcher;
pub mod handler;
pub mod parser;
pub mod registry;

use crate::persona::PersonaCatalog;
use crate::session::Session;

pub use dispatcher::CommandDispatcher;
pub use parser::{Command, CommandParser};

/// What a synchronous command handler may touch: the room's session (already
/// locked by the dispatcher) and the read-only persona catalog.
pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    pub catalog: &'a PersonaCatalog,
}
