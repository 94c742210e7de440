// toxlens: toxicity screening with attention-based reason spans.
//
// This is the library root. The decision core is scoring/ + vault + verdict;
// inference/, db/ and web/ are the adapters around it.

pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod inference;
pub mod output;
pub mod scoring;
pub mod vault;
pub mod verdict;

#[cfg(feature = "web")]
pub mod web;
