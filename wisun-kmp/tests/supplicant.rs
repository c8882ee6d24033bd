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

//! Supplicant Initial-Key state machine tests

mod common;

use common::{Event, Node};
use wisun_crypto::MockKeyIdProvider;
use wisun_kmp::eapol::{parse_pdu, EAPOL_KEY_TYPE};
use wisun_kmp::kde::KdeSet;
use wisun_kmp::keys::{GroupKeyStatus, GTK_LEN, PMK_LEN};
use wisun_kmp::{
    NodeRole, ProtocolError, SecProt, SecProtConfig, SecResult, SuppKeySecProt, SuppKeyState,
    TxFailure, TxStatus,
};

fn supplicant() -> (SuppKeySecProt, Node<MockKeyIdProvider>) {
    (
        SuppKeySecProt::new(&SecProtConfig::default()),
        Node::supplicant(MockKeyIdProvider::new()),
    )
}

#[test]
fn test_init_waits_for_create_request() {
    let (prot, node) = supplicant();
    assert_eq!(prot.state(), SuppKeyState::CreateReq);
    assert!(prot.timer_running());
    assert!(node.dispatcher.events.is_empty());
}

#[test]
fn test_full_sequence() {
    let (mut prot, mut node) = supplicant();

    prot.create_request(&mut node.ctx()).unwrap();
    assert_eq!(prot.state(), SuppKeyState::TxDone);
    assert_eq!(node.transport.sent.len(), 1);

    prot.tx_status(&mut node.ctx(), TxStatus::Ok);
    assert_eq!(prot.state(), SuppKeyState::Finished);
    assert!(prot.timer_running());

    prot.timer_timeout(&mut node.ctx(), 1);
    assert!(!prot.timer_running());
    assert!(prot.is_finished());

    assert_eq!(
        node.dispatcher.events,
        vec![
            Event::CreateConf(SecResult::Ok),
            Event::FinishedInd(SecResult::Ok),
            Event::Finished,
        ]
    );

    // Further ticks do nothing
    prot.timer_timeout(&mut node.ctx(), 100);
    assert_eq!(node.dispatcher.events.len(), 3);
}

#[test]
fn test_initial_key_frame_flags() {
    let (mut prot, mut node) = supplicant();
    prot.create_request(&mut node.ctx()).unwrap();

    let pdu = parse_pdu(node.transport.last_pdu()).unwrap();
    assert_eq!(pdu.header.packet_type, EAPOL_KEY_TYPE);
    let frame = pdu.key_frame().unwrap();
    assert!(frame.key_information.request);
    assert!(!frame.key_information.install);
    assert!(!frame.key_information.pairwise_key);
    assert_eq!(frame.replay_counter, 0);
    assert_eq!(frame.key_length, 0);
}

#[test]
fn test_initial_key_pdu_bytes() {
    let (mut prot, mut node) = supplicant();
    node.keys.set_node_role(NodeRole::Ffn);
    node.keys
        .gtks
        .insert(0, [1; GTK_LEN], GroupKeyStatus::Active)
        .unwrap();
    prot.create_request(&mut node.ctx()).unwrap();

    // Nonce, IV, RSC, reserved and MIC are all zero
    let zeros = "00".repeat(80);
    let expected = [
        "03030074",         // EAPOL v3, Key, body 116
        "02",               // RSN descriptor
        "0802",             // request, descriptor version 2
        "0000",             // key length
        "0000000000000000", // replay counter
        zeros.as_str(),
        "0015",             // key data length
        "dd050c5a9e0201",   // GTKL
        "dd050c5a9e0301",   // Node Role FFN
        "dd050c5a9e0400",   // LGTKL
    ]
    .concat();
    assert_eq!(hex::encode(node.transport.last_pdu()), expected);
}

#[test]
fn test_kdes_follow_key_material() {
    let (mut prot, mut node) = supplicant();
    node.keys.set_pmk([0x11; PMK_LEN]);
    node.keys.set_node_role(NodeRole::Ffn);
    node.keys
        .gtks
        .insert(1, [1; GTK_LEN], GroupKeyStatus::Active)
        .unwrap();
    node.keys
        .gtks
        .insert(3, [3; GTK_LEN], GroupKeyStatus::Old)
        .unwrap();
    prot.create_request(&mut node.ctx()).unwrap();

    let pdu = parse_pdu(node.transport.last_pdu()).unwrap();
    let kdes = KdeSet::decode(pdu.key_frame().unwrap().key_data).unwrap();
    assert!(kdes.pmkid.is_some());
    assert!(kdes.ptkid.is_none());
    assert_eq!(kdes.gtkl, Some(0b0010));
    assert_eq!(kdes.node_role, Some(1));
    assert_eq!(kdes.lgtkl, Some(0));
}

#[test]
fn test_failed_key_id_derivation_omits_kde() {
    let mut prot = SuppKeySecProt::new(&SecProtConfig::default());
    let mut node = Node::supplicant(MockKeyIdProvider::failing());
    node.keys.set_pmk([0x11; PMK_LEN]);
    prot.create_request(&mut node.ctx()).unwrap();

    let pdu = parse_pdu(node.transport.last_pdu()).unwrap();
    let kdes = KdeSet::decode(pdu.key_frame().unwrap().key_data).unwrap();
    assert!(kdes.pmkid.is_none());
}

#[test]
fn test_no_ack_is_reported_but_exchange_completes() {
    let (mut prot, mut node) = supplicant();
    prot.create_request(&mut node.ctx()).unwrap();
    prot.tx_status(&mut node.ctx(), TxStatus::NoAck);
    prot.timer_timeout(&mut node.ctx(), 1);

    let failure = SecResult::TxFailure(TxFailure::NoAck);
    assert_eq!(prot.result(), failure);
    assert_eq!(
        node.dispatcher.events,
        vec![
            Event::CreateConf(SecResult::Ok),
            Event::FinishedInd(failure),
            Event::Finished,
        ]
    );
}

#[test]
fn test_send_rejected_goes_to_finish() {
    let (mut prot, mut node) = supplicant();
    node.transport.fail = true;
    prot.create_request(&mut node.ctx()).unwrap();

    assert_eq!(prot.state(), SuppKeyState::Finished);
    assert_eq!(
        node.dispatcher.events,
        vec![
            Event::CreateConf(SecResult::Ok),
            Event::FinishedInd(SecResult::TxFailure(TxFailure::Unspecified)),
        ]
    );
}

#[test]
fn test_allocation_failure_skips_send() {
    let (mut prot, mut node) = supplicant();
    node.transport.header_size = wisun_kmp::MAX_PDU_SIZE;
    prot.create_request(&mut node.ctx()).unwrap();

    assert!(node.transport.sent.is_empty());
    assert_eq!(prot.result(), SecResult::AllocationFailure);
    assert_eq!(prot.state(), SuppKeyState::Finished);
    assert_eq!(
        node.dispatcher.count(|e| matches!(e, Event::FinishedInd(_))),
        1
    );
}

#[test]
fn test_timeout_before_request() {
    let mut prot = SuppKeySecProt::new(&SecProtConfig::new().with_total_timeout(50));
    let mut node = Node::supplicant(MockKeyIdProvider::new());

    prot.timer_timeout(&mut node.ctx(), 49);
    assert_eq!(prot.state(), SuppKeyState::CreateReq);
    prot.timer_timeout(&mut node.ctx(), 1);
    assert_eq!(prot.result(), SecResult::Timeout);
    assert_eq!(prot.state(), SuppKeyState::Finished);
    prot.timer_timeout(&mut node.ctx(), 1);

    assert_eq!(
        node.dispatcher.events,
        vec![Event::FinishedInd(SecResult::Timeout), Event::Finished]
    );
    assert!(node.transport.sent.is_empty());
}

#[test]
fn test_events_in_wrong_state() {
    let (mut prot, mut node) = supplicant();
    assert_eq!(
        prot.receive(&mut node.ctx(), &[]),
        Err(ProtocolError::Unsupported)
    );
    assert_eq!(
        prot.create_response(&mut node.ctx(), SecResult::Ok),
        Err(ProtocolError::Unsupported)
    );

    // TX status before anything was sent is ignored
    prot.tx_status(&mut node.ctx(), TxStatus::NoAck);
    assert_eq!(prot.state(), SuppKeyState::CreateReq);
    assert_eq!(prot.result(), SecResult::Ok);

    prot.create_request(&mut node.ctx()).unwrap();
    assert_eq!(
        prot.create_request(&mut node.ctx()),
        Err(ProtocolError::UnexpectedEvent)
    );
    assert_eq!(node.transport.sent.len(), 1);
}
