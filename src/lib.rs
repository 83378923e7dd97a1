//! strutsmig: whole-project migrations for Struts-style web applications.
//!
//! Rewrites static method-access expressions into action properties, adds
//! the delegating accessors to the action types that render each view,
//! splits dynamically dispatched actions, and translates date tag patterns.
//! Every run scans the whole project before editing any file.

// Core infrastructure - re-exported from strutsmig-core
pub use strutsmig_core::config;
pub use strutsmig_core::date_format;
pub use strutsmig_core::diff;
pub use strutsmig_core::document;
pub use strutsmig_core::error;
pub use strutsmig_core::facts;
pub use strutsmig_core::output;
pub use strutsmig_core::patch;
pub use strutsmig_core::pipeline;
pub use strutsmig_core::project;
pub use strutsmig_core::search;
pub use strutsmig_core::workspace;

// Front door
pub mod cli;
