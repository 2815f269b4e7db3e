//! # Projects List Architecture
//!
//! Projects List turns a folder of plain-text notes into a sortable, paginated
//! table. Each listed document becomes one row whose fields are read from
//! markers in its text (`#flag3`, `#draft`, `- [x]` checkboxes). The table's
//! sort and page are saved into the header of the document that hosts it, so
//! they survive reloads.
//!
//! Like any UI client of this library, the `projects-list` binary only wires
//! things together. All behavior lives here.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders tables, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Controller (controller.rs)                                 │
//! │  - One table: load, click, page, refresh, persist           │
//! │  - Returns PageViews, never prints                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Pure Core                                                  │
//! │  - extract.rs: text → Record                                │
//! │  - header.rs:  header text ⇄ HeaderFields                   │
//! │  - view.rs:    (records, ViewState) → PageView              │
//! │  - source.rs:  input block → document selection             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Abstract DocumentStore trait                             │
//! │  - FsStore (vault on disk), MemStore (testing)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! Below the CLI, code:
//! - Takes regular Rust function arguments
//! - Returns regular Rust types
//! - **Never** writes to stdout/stderr (diagnostics go through `tracing`)
//! - **Never** calls `std::process::exit`
//!
//! ## Testing Strategy
//!
//! 1. **Pure core**: unit tests next to the code, no store involved.
//! 2. **Controller**: scenario tests against [`store::memory::MemStore`],
//!    including simulated read and write failures.
//! 3. **CLI**: `tests/` drives the real binary over a temporary vault.
//!
//! ## Module Overview
//!
//! - [`model`]: records, columns, view state
//! - [`extract`]: marker extraction
//! - [`header`]: header state codec
//! - [`view`]: sort and paginate
//! - [`source`]: input blocks
//! - [`controller`]: the table state machine
//! - [`store`]: document storage
//! - [`config`]: layered configuration
//! - [`error`]: error types

pub mod config;
pub mod controller;
pub mod error;
pub mod extract;
pub mod header;
pub mod model;
pub mod source;
pub mod store;
pub mod view;
