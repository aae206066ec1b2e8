//! # Pressroom
//!
//! Snapshot pipeline for published blog posts: deterministic media
//! reference resolution, exact-extent PDF capture through headless Chrome,
//! and a two-tier snapshot serving surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌───────────────┐
//! │ Backend API  │───▶│  Print view   │───▶│  Headless     │
//! │ (posts JSON) │    │ (rewrite +   │    │  Chrome       │
//! └──────────────┘    │  render)     │    │  (PDF bytes)  │
//!                     └──────────────┘    └──────┬────────┘
//!                                                │
//!                        ┌───────────────────────┤
//!                        ▼                       ▼
//!                  ┌──────────┐          ┌──────────────┐
//!                  │   HTTP   │◀─────────│  Artifact     │
//!                  │ snapshot │  cached  │  store        │
//!                  │  route   │──miss──▶ │ (<slug>.pdf)  │
//!                  └──────────┘ redirect └──────────────┘
//! ```
//!
//! Posts carry media addresses in several storage conventions accumulated
//! over the product's history; [`rewrite`] resolves all of them to
//! context-correct absolute addresses before anything leaves the process.
//! [`snapshot`] batch-captures byte-stable PDF renderings of the posts'
//! print views, and [`server`] serves a cached artifact when one exists or
//! redirects to the backend's on-demand generation endpoint when it
//! doesn't.
//!
//! ## Quick Start
//!
//! ```bash
//! press posts                    # list published posts
//! press serve                    # serve print views + snapshots
//! press generate                 # snapshot every post
//! press generate --slug hello    # snapshot one post
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration + environment overrides |
//! | [`models`] | Core data types |
//! | [`rewrite`] | Media reference resolution |
//! | [`backend`] | Backend API client |
//! | [`view`] | Print view rendering |
//! | [`browser`] | Headless Chrome sessions |
//! | [`snapshot`] | Batch PDF generation |
//! | [`store`] | Durable artifact storage |
//! | [`server`] | HTTP server |

pub mod backend;
pub mod browser;
pub mod config;
pub mod models;
pub mod rewrite;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod view;
