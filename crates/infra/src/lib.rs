//! Infrastructure layer: event store, read models, config and external services.

pub mod event_store;
pub mod command_dispatcher;
pub mod read_model;
pub mod projections;

/// Runtime parameters and process settings.
pub mod config;

/// User and vendor lookups.
pub mod directory;

/// Outgoing vendor mail.
pub mod mail;

pub mod approval_workflow;
pub mod portal;
