//! Operator shell core for lcdiags.
//!
//! Operators type hierarchical commands (`watch site-status`) that are
//! resolved against a tree of command handlers. Some handlers start
//! repeating background tasks that stream text into the shared display
//! while the interactive loop keeps running.
//!
//! - [`CommandTree`]: immutable hierarchy built from a command root directory
//!   or from registered handler keys.
//! - [`HandlerRegistry`] / [`PluginLoader`]: command path to handler factory.
//! - [`Dispatcher`]: tokenizes a line, walks the tree, runs the handler.
//! - [`Supervisor`]: cancellable repeating tasks writing to the display.
//! - [`Session`] / [`Shell`]: what handlers see, and what front ends drive.
//!
//! # Example
//!
//! ```rust,ignore
//! use lcdiags_shell::{CommandTree, DisplayBuffer, HandlerRegistry, Session, Shell};
//!
//! let registry = HandlerRegistry::new().with("watch/counter", counter_factory);
//! let tree = CommandTree::from_keys(registry.keys());
//! let shell = Shell::from_parts(tree, registry, Session::new(Arc::new(DisplayBuffer::default())));
//! shell.submit("watch counter").await;
//! ```

pub mod batch;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod session;
pub mod shell;
pub mod supervisor;
pub mod tree;

pub use batch::{BATCH_FILE_NAME, BatchScript};
pub use dispatcher::{DispatchOutcome, Dispatcher, LIST_TOKEN, Notice, QUIT_TOKEN, Resolution};
pub use error::{HandlerError, Result, ShellError};
pub use registry::{
    CommandHandler, HandlerContext, HandlerFactory, HandlerRegistry, LoadedHandler, PluginLoader,
    normalize_key,
};
pub use session::{DisplayBuffer, DisplaySink, DisplayState, NullSink, Session};
pub use shell::{BatchReport, Shell};
pub use supervisor::{Producer, StopReport, Supervisor, TaskExit, TaskHandle, TaskId, TaskInfo};
pub use tree::{CommandNode, CommandTree, HANDLER_UNIT_FILE, HandlerUnit, LeafInfo, RESERVED_PREFIX};
