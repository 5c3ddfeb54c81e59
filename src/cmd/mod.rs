/*!
Command modules.

  actions.rs   static registry of remote actions + usage catalog
  shared.rs    key=value parsing, conversion, payload / request building
  settings.rs  flag > env > default resolution of connection settings
  call.rs      CallArgs + execute_call (the single command)
  output.rs    pretty / json / shell result renderers
  format.rs    color / box / table helpers for human-facing text

`execute_call` returns `anyhow::Result<()>`; failures carry a `UsageError`
or an `rpc::RpcError` for `main` to classify.
*/

pub mod actions;
pub mod call;
pub mod format;
pub mod output;
pub mod settings;
pub mod shared;

pub use call::{CallArgs, execute_call};
pub use shared::UsageError;
