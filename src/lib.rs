//! Terminal dashboard for Steam achievements.
//!
//! `api` talks to the Steam Web API, `auth` maps Steam sign-in onto
//! Supabase accounts, and `internal::ui` drives the ratatui front end.

pub mod api;
pub mod auth;
pub mod config;
pub mod internal;
pub mod tui;
pub mod utils;
