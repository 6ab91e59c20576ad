//! # Repo Indexer
//!
//! Codebase indexing and incremental sync for linked GitHub repositories.
//!
//! A full index lists a repository's tree, keeps the source files worth
//! reading, extracts an approximate public surface from each one (exports,
//! imports, functions, classes, types), asks a fast model for a short
//! summary of every file, embeds those summaries, and finally asks a
//! stronger model for one architecture overview per workspace. A resync
//! reconciles the stored modules with the live tree by path.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐   ┌──────────┐
//! │  GitHub  │──▶│ Filter+Parse │──▶│ Summarize + │──▶│  SQLite  │
//! │ tree/blob│   │  (batched)   │   │   Embed     │   │ modules  │
//! └──────────┘   └──────────────┘   └─────────────┘   └────┬─────┘
//!                                                          │
//!                      ┌───────────────────────────────────┤
//!                      ▼                                   ▼
//!                 ┌──────────┐                       ┌──────────┐
//!                 │   CLI    │                       │   HTTP   │
//!                 │  (ridx)  │                       │   API    │
//!                 └──────────┘                       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ridx init                                   # create database
//! ridx connect acme/web --workspace ws1       # link a repository
//! ridx index <connection-id>                  # full index
//! ridx resync <connection-id>                 # pick up added/removed files
//! ridx architecture ws1                       # print the overview
//! ridx serve                                  # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Source and run error taxonomy |
//! | [`github`] | Repository fetcher |
//! | [`filter`] | Eligibility, language and module-type detection |
//! | [`parser`] | Approximate per-language structural scanners |
//! | [`indexer`] | Full index runs |
//! | [`summarize`] | Module summaries and embeddings |
//! | [`architecture`] | Workspace architecture synthesis |
//! | [`resync`] | Incremental add/remove sync |
//! | [`generation`] | Text generation providers |
//! | [`http`] | JSON POST with retry and backoff |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`progress`] | Run progress events |
//! | [`store`] | SQL for every table |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod architecture;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod generation;
pub mod github;
pub mod http;
pub mod indexer;
pub mod migrate;
pub mod models;
pub mod parser;
pub mod progress;
pub mod resync;
pub mod server;
pub mod store;
pub mod summarize;
