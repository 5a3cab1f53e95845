//! Deployment orchestration scenarios.

mod bdd_steps;
mod concurrency;
mod scenarios;
mod test_helpers;
