//! LLM Gateway - Model Routing and Cost Accounting Service
//!
//! This crate implements an HTTP gateway that accepts chat-completion
//! requests, routes each one to an upstream model, falls back to alternate
//! models on transient failure, and records token and cost accounting for
//! every successful request.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
