//! ielts-core: data model and session logic for IELTS test taking.
//!
//! This crate holds the test/submission model, the per-attempt state
//! machines (session, countdown, section navigation, media widgets) and the
//! submission dispatcher. Network access happens only through the traits in
//! [`traits`].

pub mod answers;
pub mod countdown;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod media;
pub mod model;
pub mod navigator;
pub mod parser;
pub mod session;
pub mod traits;
