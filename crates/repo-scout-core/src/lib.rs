//! # Repo Scout Core
//!
//! Shared, runtime-agnostic logic for Repo Scout: data models, the
//! strategy query builders, the concurrent fan-out executor, the result
//! fusion and ranking engine, the contributor-overlap analyzer, the
//! store abstraction, and vector helpers.
//!
//! This crate contains no tokio, sqlx, HTTP clients, or other
//! native-only dependencies. Everything that talks to the outside world
//! goes through the [`host::RepoHost`], [`host::AiAdapter`], and
//! [`store::Store`] traits, which the application crate implements.

pub mod contributors;
pub mod embedding;
pub mod executor;
pub mod fusion;
pub mod host;
pub mod model;
pub mod store;
pub mod strategy;
