// Library root
// -----------
// This crate exposes the library surface used by the `lanzou` binary.
//
// Module responsibilities:
// - `api`: typed calls against the Lanzou web API and session handling.
// - `transport`: blocking HTTP with a shared cookie jar behind a trait.
// - `session`: cookie persistence and the account-page session check.
// - `nav`: current folder and the ancestor stack for `cd ..`.
// - `upload` / `retry`: size gate, upload with progress, fixed-delay retry.
// - `ui`: command parsing, dispatch and the interactive shell.
// - `config`, `logging`, `error`: ambient plumbing.
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod nav;
pub mod retry;
pub mod session;
pub mod transport;
pub mod ui;
pub mod upload;

pub use api::{LanzouClient, ROOT_FOLDER_ID};
pub use error::{LanzouError, Result};
