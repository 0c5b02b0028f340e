//! Dashboard filter expressions.
//!
//! Host dashboards hand filters to the topology data source as text such as
//! `environment = "prod" && calls >= 10`. They are parsed here into the typed
//! root-node filters carried by a topology request.

pub mod ast;
pub mod parser;

pub use ast::{Filter, FilterExpression, LogicalOp, Operator, Value};
pub use parser::{parse_filter_expression, parse_filters};
