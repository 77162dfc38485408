//! Bitrix24 REST API exposed as MCP tools.
//!
//! Tool arguments are normalized into REST parameters, sent through a
//! [`client::Transport`], and every outcome is reported as an
//! [`envelope::Envelope`].

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod mcp;
pub mod normalize;
pub mod response;
pub mod tools;
