// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared state handed to every axum handler.

use runctl_bus::BroadcastBus;
use runctl_coordinator::Coordinator;
use runctl_scheduler::AnyScheduler;
use runctl_store::WalRunStore;
use std::sync::Arc;

pub type Store = WalRunStore;
pub type Scheduler = AnyScheduler;
pub type Coord = Coordinator<Store, Scheduler>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub bus: Arc<BroadcastBus>,
    pub coordinator: Arc<Coord>,
}
