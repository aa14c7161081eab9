//! Integration suite: end-to-end scenarios against the public API.

mod scenarios;
mod properties;
