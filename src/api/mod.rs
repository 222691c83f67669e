//! Clients for services this one calls over HTTP.

pub mod identity;
