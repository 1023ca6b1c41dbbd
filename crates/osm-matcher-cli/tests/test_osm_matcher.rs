//! Integration tests for `osm-matcher`

mod common;
use common::*;

mod help;
mod matching;
mod planet;
mod rules;
mod sql;
