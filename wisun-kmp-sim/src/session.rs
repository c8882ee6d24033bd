// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! One protocol instance plus the node state it runs against

use std::collections::VecDeque;

use tracing::{debug, info, warn};
use wisun_crypto::KeyIdProvider;
use wisun_kmp::{
    EapolTransport, KmpDispatcher, KmpService, KmpType, PeerAddrs, ProtocolError, SecKeys,
    SecProt, SecProtConfig, SecProtContext, SecProtInstance, SecResult, TxError, TxStatus,
};

use crate::SimError;

/// What happens to frames handed to the loopback transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxMode {
    /// Frame reaches the peer and is acknowledged
    #[default]
    Deliver,
    /// Frame is accepted but lost; the link reports no ACK
    NoAck,
    /// Transport refuses the frame synchronously
    Reject,
}

/// In-memory transport that queues outbound frames
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    header_size: usize,
    mode: TxMode,
    outbox: VecDeque<Vec<u8>>,
}

impl LoopbackTransport {
    pub fn new(header_size: usize, mode: TxMode) -> Self {
        Self {
            header_size,
            mode,
            outbox: VecDeque::new(),
        }
    }

    /// Next queued EAPOL PDU, header reservation stripped
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        let frame = self.outbox.pop_front()?;
        frame.get(self.header_size..).map(<[u8]>::to_vec)
    }

    pub fn mode(&self) -> TxMode {
        self.mode
    }
}

impl EapolTransport for LoopbackTransport {
    fn header_size(&self) -> usize {
        self.header_size
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TxError> {
        if self.mode == TxMode::Reject {
            warn!("loopback transport rejecting {} byte frame", frame.len());
            return Err(TxError::Unavailable);
        }
        debug!("queued {} byte frame", frame.len());
        self.outbox.push_back(frame.to_vec());
        Ok(())
    }
}

/// Callback as seen by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmpEvent {
    CreateConf(SecResult),
    CreateInd,
    FinishedInd(SecResult),
    Finished,
}

/// Dispatcher that logs and records every callback
#[derive(Debug)]
pub struct RecordingDispatcher {
    node: &'static str,
    pub events: Vec<KmpEvent>,
}

impl RecordingDispatcher {
    pub fn new(node: &'static str) -> Self {
        Self {
            node,
            events: Vec::new(),
        }
    }
}

impl KmpDispatcher for RecordingDispatcher {
    fn create_conf(&mut self, result: SecResult) {
        info!(node = self.node, "KMP-CREATE.confirm {:?}", result);
        self.events.push(KmpEvent::CreateConf(result));
    }

    fn create_ind(&mut self) {
        info!(node = self.node, "KMP-CREATE.indication");
        self.events.push(KmpEvent::CreateInd);
    }

    fn finished_ind(&mut self, result: SecResult, _keys: Option<&SecKeys>) {
        info!(node = self.node, "KMP-FINISHED.indication {:?}", result);
        self.events.push(KmpEvent::FinishedInd(result));
    }

    fn finished(&mut self) {
        info!(node = self.node, "KMP finished");
        self.events.push(KmpEvent::Finished);
    }
}

/// A protocol instance driven against one node's keys and transport
pub struct KmpSession<P> {
    pub keys: SecKeys,
    pub transport: LoopbackTransport,
    pub dispatcher: RecordingDispatcher,
    provider: P,
    addrs: PeerAddrs,
    instance: SecProtInstance,
}

impl<P: KeyIdProvider> KmpSession<P> {
    /// Instantiate `kmp_type` from `service`
    ///
    /// # Errors
    ///
    /// `SimError::Registration` if `kmp_type` is not registered
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node: &'static str,
        service: &KmpService,
        kmp_type: KmpType,
        config: &SecProtConfig,
        keys: SecKeys,
        provider: P,
        addrs: PeerAddrs,
        transport: LoopbackTransport,
    ) -> Result<Self, SimError> {
        let instance = service.create(kmp_type, config)?;
        debug!(node, ?kmp_type, local = %addrs.local, remote = %addrs.remote, "session created");
        Ok(Self {
            keys,
            transport,
            dispatcher: RecordingDispatcher::new(node),
            provider,
            addrs,
            instance,
        })
    }

    fn with_ctx<R>(
        &mut self,
        f: impl FnOnce(&mut SecProtInstance, &mut SecProtContext<'_>) -> R,
    ) -> R {
        let mut ctx = SecProtContext {
            keys: &mut self.keys,
            transport: &mut self.transport,
            dispatcher: &mut self.dispatcher,
            key_ids: &self.provider,
            addrs: self.addrs,
        };
        f(&mut self.instance, &mut ctx)
    }

    /// # Errors
    ///
    /// `ProtocolError` if the instance does not take a request now
    pub fn create_request(&mut self) -> Result<(), ProtocolError> {
        self.with_ctx(|prot, ctx| prot.create_request(ctx))
    }

    /// # Errors
    ///
    /// `ProtocolError` if the instance does not take a response now
    pub fn create_response(&mut self, result: SecResult) -> Result<(), ProtocolError> {
        self.with_ctx(|prot, ctx| prot.create_response(ctx, result))
    }

    /// # Errors
    ///
    /// The `ProtocolError` that rejected `pdu`
    pub fn receive(&mut self, pdu: &[u8]) -> Result<(), ProtocolError> {
        self.with_ctx(|prot, ctx| prot.receive(ctx, pdu))
    }

    pub fn tx_status(&mut self, status: TxStatus) {
        self.with_ctx(|prot, ctx| prot.tx_status(ctx, status));
    }

    pub fn tick(&mut self, ticks: u16) {
        self.with_ctx(|prot, ctx| prot.timer_timeout(ctx, ticks));
    }

    pub fn result(&self) -> SecResult {
        self.instance.result()
    }

    /// Finished and past the cleanup window
    pub fn is_done(&self) -> bool {
        self.instance.is_finished() && !self.instance.timer_running()
    }

    pub fn instance(&self) -> &SecProtInstance {
        &self.instance
    }
}
