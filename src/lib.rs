//! Record-dialog controllers for the sweepstake administration app.
//!
//! A [`modal::ModalController`] binds a dialog's visibility, the load of the
//! record under edit, a validated form and the save mutation into one
//! lifecycle. Entity dialogs live in [`modals`]; [`state::AppState`] wires them
//! to the configured record store, the toast hub and the listing cache.

pub mod cache;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod modal;
pub mod modals;
pub mod notify;
pub mod state;
pub mod telemetry;
pub mod validation;

#[cfg(test)]
mod test_support;
