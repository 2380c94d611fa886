//! Invoice Tracker - freelancer invoicing, expenses and payment reminders.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod startup;
