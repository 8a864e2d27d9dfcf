// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Keep projects in line with a primary project.
//!
//! Minus compares the declared packages and settings files of a project
//! against a designated __primary project__, reports every difference, and
//! pulls the primary state over on request. It can also stamp out new
//! projects from an existing one, carrying over packages, settings, and
//! selected asset folders.
//!
//! # Package Status
//!
//! Every package of the primary project is classified against this project:
//!
//! - __Valid__: installed at the same version.
//! - __Invalid__: installed at a different version.
//! - __Missing__: not installed at all.
//! - __Local-only__: installed from the local file system, only reported
//!   when local-only detection is enabled.
//!
//! Settings files are compared by content checksum instead of version.

pub mod catalog;
pub mod clone;
pub mod compare;
pub mod config;
pub mod hash;
pub mod manifest;
pub mod package_manager;
pub mod path;
pub mod prompt;
pub mod sync;
