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

//! End-to-end Initial-Key exchanges through the loopback dispatcher

use wisun_common::Eui64;
use wisun_crypto::KeyIdAlgorithm;
use wisun_kmp::eapol::EAPOL_HEADER_LEN;
use wisun_kmp::{KmpType, NodeRole, SecProtConfig, SecResult, TxFailure};
use wisun_kmp_sim::{run_initial_key_exchange, KmpEvent, NodeSetup, Scenario, TxMode};

const SUPP: Eui64 = Eui64::new([0x02, 0, 0, 0, 0, 0, 0, 0x02]);
const AUTH: Eui64 = Eui64::new([0x02, 0, 0, 0, 0, 0, 0, 0x01]);

fn scenario() -> Scenario {
    Scenario::new(NodeSetup::new(SUPP), NodeSetup::new(AUTH))
}

#[test]
fn test_empty_material() {
    let report = run_initial_key_exchange(&scenario()).unwrap();

    assert_eq!(
        report.supplicant_events,
        vec![
            KmpEvent::CreateConf(SecResult::Ok),
            KmpEvent::FinishedInd(SecResult::Ok),
            KmpEvent::Finished,
        ]
    );
    assert_eq!(
        report.authenticator_events,
        vec![
            KmpEvent::CreateInd,
            KmpEvent::FinishedInd(SecResult::Ok),
            KmpEvent::Finished,
        ]
    );
    assert!(!report.pmk_live);
    assert!(!report.ptk_live);
    assert_eq!(report.node_role, NodeRole::Unknown);
    assert_eq!(report.gtkl, 0);
    assert_eq!(report.lgtkl, 0);
    assert!(report.receive_error.is_none());
}

#[test]
fn test_matching_keys_are_live() {
    let mut s = scenario();
    for node in [&mut s.supplicant, &mut s.authenticator] {
        node.pmk = Some([0x11; 32]);
        node.ptk = Some([0x22; 48]);
    }
    s.supplicant.node_role = NodeRole::Ffn;
    s.supplicant.live_gtks = 0b0011;
    s.supplicant.live_lgtks = 0b001;
    s.kmp_type = KmpType::Ieee8021xMkaKey;

    let report = run_initial_key_exchange(&s).unwrap();
    assert!(report.pmk_live);
    assert!(report.ptk_live);
    assert_eq!(report.node_role, NodeRole::Ffn);
    assert_eq!(report.gtkl, 0b0011);
    assert_eq!(report.lgtkl, 0b001);
}

#[test]
fn test_sha256_ids_agree() {
    let mut s = scenario();
    s.supplicant.pmk = Some([0x33; 32]);
    s.authenticator.pmk = Some([0x33; 32]);
    s.algorithm = KeyIdAlgorithm::HmacSha256_128;
    assert!(run_initial_key_exchange(&s).unwrap().pmk_live);
}

#[test]
fn test_stale_ptk_is_not_live() {
    let mut s = scenario();
    s.supplicant.pmk = Some([0x11; 32]);
    s.supplicant.ptk = Some([0x22; 48]);
    s.authenticator.pmk = Some([0x11; 32]);
    s.authenticator.ptk = Some([0x99; 48]);

    let report = run_initial_key_exchange(&s).unwrap();
    assert!(report.pmk_live);
    assert!(!report.ptk_live);
}

#[test]
fn test_lfn_omits_gtkl() {
    let mut s = scenario();
    s.supplicant.node_role = NodeRole::Lfn;
    s.supplicant.live_gtks = 0b1111;
    s.supplicant.live_lgtks = 0b110;

    let report = run_initial_key_exchange(&s).unwrap();
    assert_eq!(report.node_role, NodeRole::Lfn);
    assert_eq!(report.gtkl, 0);
    assert_eq!(report.lgtkl, 0b110);
}

#[test]
fn test_header_reservation_is_stripped() {
    let mut s = scenario();
    s.header_size = 12;
    let report = run_initial_key_exchange(&s).unwrap();
    let pdu = report.pdu.unwrap();
    assert_eq!(pdu[0], 3);
    assert_eq!(pdu[1], 3);
    let body_len = usize::from(u16::from_be_bytes([pdu[2], pdu[3]]));
    assert_eq!(pdu.len(), EAPOL_HEADER_LEN + body_len);
}

#[test]
fn test_lost_frame_times_out_authenticator() {
    let mut s = scenario();
    s.tx_mode = TxMode::NoAck;
    s.config = SecProtConfig::new().with_total_timeout(20);

    let report = run_initial_key_exchange(&s).unwrap();
    assert_eq!(
        report.supplicant_result,
        SecResult::TxFailure(TxFailure::NoAck)
    );
    assert_eq!(report.authenticator_result, SecResult::Timeout);
    assert_eq!(
        report.authenticator_events,
        vec![KmpEvent::FinishedInd(SecResult::Timeout), KmpEvent::Finished]
    );
}

#[test]
fn test_rejected_send() {
    let mut s = scenario();
    s.tx_mode = TxMode::Reject;

    let report = run_initial_key_exchange(&s).unwrap();
    assert!(report.pdu.is_none());
    assert_eq!(
        report.supplicant_events,
        vec![
            KmpEvent::CreateConf(SecResult::Ok),
            KmpEvent::FinishedInd(SecResult::TxFailure(TxFailure::Unspecified)),
            KmpEvent::Finished,
        ]
    );
}

#[test]
fn test_oversized_header_is_allocation_failure() {
    let mut s = scenario();
    s.header_size = wisun_kmp::MAX_PDU_SIZE;

    let report = run_initial_key_exchange(&s).unwrap();
    assert!(report.pdu.is_none());
    assert_eq!(report.supplicant_result, SecResult::AllocationFailure);
    assert!(report.receive_error.is_none());
    assert_eq!(report.authenticator_result, SecResult::Timeout);
}

#[test]
fn test_invalid_group_key_mask() {
    let mut s = scenario();
    s.supplicant.live_gtks = 0b1_0000;
    assert!(run_initial_key_exchange(&s).is_err());
}
