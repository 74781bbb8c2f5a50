//! Application-level orchestration utilities.
//!
//! This module owns the workflow controller task (uploads and sends run off the
//! UI thread) and post-send processing such as aggregation and exports. UI/CLI
//! layers call into this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::process_send_completion;
