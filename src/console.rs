// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Build console output and component-scan log routing.
//!
//! The component-analysis engine reports progress through a process-wide
//! diagnostic channel. During OSA scan creation the orchestrator attaches
//! the build's own console to that channel so the lines land in the build
//! log, and detaches it again when the phase ends. Attach and detach are
//! serialized by the slot's mutex so concurrent runs in one process cannot
//! leave a stale sink behind.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Sink for lines that must reach the CI build output.
pub trait BuildConsole: Send + Sync {
    fn line(&self, message: &str);
}

/// Default console: forwards build lines to the tracing pipeline.
pub struct TracingConsole;

impl BuildConsole for TracingConsole {
    fn line(&self, message: &str) {
        info!(target: "build", "{}", message);
    }
}

static COMPONENT_SINK: Mutex<Option<Arc<dyn BuildConsole>>> = Mutex::new(None);

/// Scoped attachment of a build console to the component-scan channel.
///
/// Dropping the guard restores whatever sink was attached before, also on
/// error and cancellation paths.
pub struct ComponentLogGuard {
    previous: Option<Arc<dyn BuildConsole>>,
}

/// Route component-scan diagnostics to `sink` until the guard drops.
#[must_use = "dropping the guard immediately detaches the sink"]
pub fn attach_component_sink(sink: Arc<dyn BuildConsole>) -> ComponentLogGuard {
    let previous = COMPONENT_SINK.lock().replace(sink);
    ComponentLogGuard { previous }
}

impl Drop for ComponentLogGuard {
    fn drop(&mut self) {
        *COMPONENT_SINK.lock() = self.previous.take();
    }
}

/// Emit one component-scan diagnostic line.
///
/// Dropped silently when no sink is attached, matching the engine's
/// behavior outside an OSA creation phase.
pub fn component_line(message: &str) {
    let sink = COMPONENT_SINK.lock().clone();
    if let Some(sink) = sink {
        sink.line(&format!("[ComponentScan] {}", message));
    }
}
