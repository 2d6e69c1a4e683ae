//! This module contains various tools that help the ergonomics of this crate.

pub(crate) mod human_readable;
pub(crate) mod logging;
