// This file is part of the tradeloop engine.
// Copyright (C) 2026 Tradeloop Contributors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::events::DiscoveryEvent;
use async_stream::stream;
use futures::Stream;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Publishes [`DiscoveryEvent`]s onto the internal Event Bus. Created once during process init
/// and handed to every component that needs to publish; no listener ever registers itself at
/// module-load time (spec.md §9, "event listeners registered on module import").
#[trait_variant::make(Send)]
pub trait Publisher
where
    Self: Clone + Send + Sync + 'static,
{
    async fn publish(&self, event: DiscoveryEvent) -> Result<(), PubSubError>;
}

/// Subscribes to the internal Event Bus. Each call to [`Subscriber::subscribe`] yields an
/// independent stream; dropping it unregisters that particular subscription.
pub trait Subscriber
where
    Self: Clone + Send + Sync + 'static,
{
    fn subscribe(&self) -> impl Stream<Item = Result<DiscoveryEvent, PubSubError>> + Send + 'static;
}

#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("event bus is closed")]
    Closed,

    #[error("subscriber lagged and missed {0} events")]
    Lagged(u64),
}

/// In-process event bus backed by [`tokio::sync::broadcast`], used by the `standalone`
/// composition root (a single OS process hosting every tenant).
#[derive(Clone)]
pub struct InMemoryBus {
    sender: Arc<broadcast::Sender<DiscoveryEvent>>,
}

impl InMemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl Publisher for InMemoryBus {
    async fn publish(&self, event: DiscoveryEvent) -> Result<(), PubSubError> {
        // No receivers is not an error: a publish with zero current subscribers is routine
        // (e.g. during startup before any query subscriptions exist).
        let _ = self.sender.send(event);
        Ok(())
    }
}

impl Subscriber for InMemoryBus {
    fn subscribe(&self) -> impl Stream<Item = Result<DiscoveryEvent, PubSubError>> + Send + 'static {
        let mut receiver = self.sender.subscribe();

        stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield Ok(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        yield Err(PubSubError::Lagged(skipped));
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        yield Err(PubSubError::Closed);
                        break;
                    }
                }
            }
        }
    }
}

/// A [`Publisher`]/[`Subscriber`] that discards everything, for components that do not yet need
/// event wiring (mirrors the workspace's own `NoopSubscriber`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPubSub;

impl Publisher for NoopPubSub {
    async fn publish(&self, _event: DiscoveryEvent) -> Result<(), PubSubError> {
        Ok(())
    }
}

impl Subscriber for NoopPubSub {
    fn subscribe(&self) -> impl Stream<Item = Result<DiscoveryEvent, PubSubError>> + Send + 'static {
        futures::stream::empty()
    }
}
