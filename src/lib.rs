//! Main crate for the `designate_acme_solver` application.
//!
//! Solves ACME DNS-01 challenges by publishing TXT records in OpenStack Designate zones.
//!
//! For more information, choose one of the modules below.
//! The following modules might be of interest if you want to add new functionality:
//! - [`solver`]s implement the challenge lifecycle (present and clean up) that the issuing controller calls into
//! - [`provider`]s are DNS zone services such as Designate that ultimately serve the challenge records
//! - [`config`] contains the per-challenge zone configuration and the client credentials

#![allow(clippy::uninlined_format_args)]

pub mod challenge;
pub mod config;
pub mod provider;
pub mod solver;
