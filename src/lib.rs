//! Onboarding Bot — Slack onboarding checklist service.

pub mod config;
pub mod error;
pub mod oauth;
pub mod onboarding;
pub mod routes;
pub mod slack;
pub mod store;

#[cfg(test)]
mod test_support;
