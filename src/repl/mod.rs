//! Buffer-backed REPL engine
//!
//! The transcript lives in an editor buffer: input statements, and output
//! ranges marked by highlight class. The modules here split the work:
//!
//! - [`continuation`]: which lines form the statement under the cursor
//! - [`history`]: recall of submitted statements
//! - [`ranges`]: output range bookkeeping and navigation
//! - [`commands`]: the `/command` table
//! - [`backend_trait`]: the evaluator protocol and context redirection
//! - [`completion`]: routing completion requests
//! - [`session`]: one REPL instance tying the above together

pub mod backend_trait;
pub mod commands;
pub mod completion;
pub mod continuation;
pub mod engine;
pub mod error;
pub mod history;
pub mod host;
pub mod line;
pub mod ranges;
pub mod registry;
pub mod session;

pub use backend_trait::{
    Completion, ContextGuard, EvalContext, EvalResult, Language, OutputChunk, OutputSink,
    ReplBackend,
};
pub use commands::{Argument, CommandKind, CommandResult, COMMANDS, DEFAULT_PREFIX};
pub use continuation::{Statement, DEFAULT_MARKER};
pub use error::{ReplError, ReplResult};
pub use history::{Direction, History};
pub use host::{BufferId, Host, MemoryHost, WindowId};
pub use ranges::{HighlightClass, OutputRange, OutputTracker, Segment};
pub use registry::SessionRegistry;
pub use session::{Dispatch, Session, SubmitOutcome};
