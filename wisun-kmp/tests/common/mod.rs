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

//! Common test utilities for wisun-kmp tests

#![allow(dead_code)]

use wisun_common::Eui64;
use wisun_crypto::KeyIdProvider;
use wisun_kmp::{
    EapolTransport, KmpDispatcher, PeerAddrs, SecKeys, SecProtContext, SecResult, TxError,
};

pub const AUTH_EUI64: Eui64 = Eui64::new([0x02, 0, 0, 0, 0, 0, 0, 0x01]);
pub const SUPP_EUI64: Eui64 = Eui64::new([0x02, 0, 0, 0, 0, 0, 0, 0x02]);

/// Callback recorded by `RecordingDispatcher`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    CreateConf(SecResult),
    CreateInd,
    FinishedInd(SecResult),
    Finished,
}

#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub events: Vec<Event>,
}

impl RecordingDispatcher {
    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl KmpDispatcher for RecordingDispatcher {
    fn create_conf(&mut self, result: SecResult) {
        self.events.push(Event::CreateConf(result));
    }

    fn create_ind(&mut self) {
        self.events.push(Event::CreateInd);
    }

    fn finished_ind(&mut self, result: SecResult, _keys: Option<&SecKeys>) {
        self.events.push(Event::FinishedInd(result));
    }

    fn finished(&mut self) {
        self.events.push(Event::Finished);
    }
}

/// Transport that keeps every frame it is handed
#[derive(Debug, Default)]
pub struct CaptureTransport {
    pub header_size: usize,
    pub fail: bool,
    pub sent: Vec<Vec<u8>>,
}

impl CaptureTransport {
    /// Last frame without the header reservation
    pub fn last_pdu(&self) -> &[u8] {
        let frame = self.sent.last().expect("nothing sent");
        &frame[self.header_size..]
    }
}

impl EapolTransport for CaptureTransport {
    fn header_size(&self) -> usize {
        self.header_size
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TxError> {
        if self.fail {
            return Err(TxError::Rejected);
        }
        self.sent.push(frame.to_vec());
        Ok(())
    }
}

/// One side of a pairing: its key material and test doubles
pub struct Node<P> {
    pub keys: SecKeys,
    pub transport: CaptureTransport,
    pub dispatcher: RecordingDispatcher,
    pub provider: P,
    pub addrs: PeerAddrs,
}

impl<P: KeyIdProvider> Node<P> {
    pub fn supplicant(provider: P) -> Self {
        Self::new(provider, PeerAddrs::new(SUPP_EUI64, AUTH_EUI64))
    }

    pub fn authenticator(provider: P) -> Self {
        Self::new(provider, PeerAddrs::new(AUTH_EUI64, SUPP_EUI64))
    }

    fn new(provider: P, addrs: PeerAddrs) -> Self {
        Self {
            keys: SecKeys::new(),
            transport: CaptureTransport::default(),
            dispatcher: RecordingDispatcher::default(),
            provider,
            addrs,
        }
    }

    pub fn ctx(&mut self) -> SecProtContext<'_> {
        SecProtContext {
            keys: &mut self.keys,
            transport: &mut self.transport,
            dispatcher: &mut self.dispatcher,
            key_ids: &self.provider,
            addrs: self.addrs,
        }
    }
}
