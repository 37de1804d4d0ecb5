//! Application-level orchestration.
//!
//! This module owns the layout transition: flag-file mutation followed by the process
//! actions for the new layout. The CLI layer builds a [`Toggler`] and calls into it.

mod controller;

pub(crate) use controller::Toggler;
