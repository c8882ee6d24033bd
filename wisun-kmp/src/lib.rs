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

#![cfg_attr(not(test), no_std)]
#![allow(clippy::too_many_lines, clippy::items_after_statements)]

//! Wi-SUN Key Management Protocol (KMP)
//!
//! This crate implements the security protocol layer that runs between a
//! joining mesh node (supplicant) and the network authenticator. It holds:
//!
//! - the generic sub-protocol engine (`sec_prot`): state, result, retry timer
//!   and the event surface every KMP sub-protocol implements,
//! - the Initial-Key exchange (`key_sec_prot`), which tells the authenticator
//!   which PMK/PTK/GTK/LGTK the supplicant still holds,
//! - the KDE and EAPOL-Key codecs those messages are built from,
//! - the per-peer key material store (`keys`),
//! - the registry that maps a KMP type to its implementation (`registry`).
//!
//! The crate is Sans-IO: it never sends, sleeps or reads a clock. The owning
//! dispatcher feeds it events and receives frames and indications back
//! through the `EapolTransport` and `KmpDispatcher` traits.

pub mod config;
pub mod eapol;
pub mod kde;
pub mod key_sec_prot;
pub mod keys;
pub mod registry;
pub mod sec_prot;

pub use config::SecProtConfig;
pub use key_sec_prot::{AuthKeySecProt, AuthKeyState, SuppKeySecProt, SuppKeyState};
pub use keys::{GroupKeyStatus, NodeRole, SecKeys};
pub use registry::{
    auth_key_sec_prot_register, supp_key_sec_prot_register, KmpService, KmpType,
    RegistrationError, SecProtInstance,
};
pub use sec_prot::{
    EapolTransport, KmpDispatcher, PeerAddrs, ProtocolError, SecProt, SecProtContext, SecResult,
    TxError, TxFailure, TxStatus,
};

/// Maximum size of an outbound PDU, including the transport header reservation
pub const MAX_PDU_SIZE: usize = 256;
