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

//! Initial-Key exchange
//!
//! The first message a joining node sends. It tells the authenticator which
//! keys the supplicant still holds so the authenticator can skip whatever
//! handshakes are not needed:
//!
//! ```text
//! Supplicant                                   Authenticator
//!     │  EAPOL-Key (request)                        │
//!     │  PMKID? PTKID? GTKL? NodeRole? LGTKL?       │
//!     │ ───────────────────────────────────────────▶│ compare PMKID/PTKID
//!     │                                             │ store GTKL/LGTKL/role
//! ```
//!
//! There is no reply; the authenticator's dispatcher starts the follow-up
//! protocol (4WH, GKH, EAP-TLS) from what was learned.

mod authenticator;
mod supplicant;

pub use authenticator::{AuthKeySecProt, AuthKeyState};
pub use supplicant::{SuppKeySecProt, SuppKeyState};

use heapless::Vec;
use subtle::ConstantTimeEq;
use wisun_crypto::KeyId;

use crate::eapol::{self, EapolKeyFrame};
use crate::kde::KdeSet;
use crate::keys::NodeRole;
use crate::sec_prot::{ProtocolError, SecProtContext};
use crate::MAX_PDU_SIZE;

/// KDEs the supplicant announces for its current key material
fn initial_key_kdes(ctx: &SecProtContext<'_>) -> KdeSet {
    let keys = &*ctx.keys;
    let role = keys.node_role();
    let role_wire = role.to_wire();
    KdeSet {
        pmkid: ctx.pmkid_generate(false),
        ptkid: ctx.ptkid_generate(false),
        gtkl: (role != NodeRole::Lfn).then(|| keys.gtks.fresh_gtkl()),
        node_role: role_wire,
        lgtkl: role_wire.map(|_| keys.lgtks.fresh_gtkl()),
    }
}

/// Build and send the Initial-Key EAPOL-Key PDU
pub(crate) fn initial_key_send(ctx: &mut SecProtContext<'_>) -> Result<(), ProtocolError> {
    let kdes = initial_key_kdes(ctx);
    let key_data = kdes
        .to_vec()
        .map_err(|_| ProtocolError::AllocationFailure)?;
    let frame = EapolKeyFrame::initial_key(&key_data);

    let header_size = ctx.transport.header_size();
    let frame_len = header_size
        .checked_add(eapol::key_pdu_len(&frame))
        .ok_or(ProtocolError::AllocationFailure)?;
    let mut pdu: Vec<u8, MAX_PDU_SIZE> = Vec::new();
    pdu.resize(frame_len, 0)
        .map_err(|()| ProtocolError::AllocationFailure)?;
    {
        let mut out: &mut [u8] = &mut pdu[header_size..];
        eapol::write_key_pdu(&frame, &mut out)
            .map_err(|_| ProtocolError::AllocationFailure)?;
    }

    log::debug!(
        "Initial EAPOL-Key send to {}, PMKID {} PTKID {} GTKL {:x}",
        ctx.addrs.remote,
        if kdes.pmkid.is_some() { "set" } else { "not set" },
        if kdes.ptkid.is_some() { "set" } else { "not set" },
        kdes.gtkl.unwrap_or(0)
    );

    ctx.transport.send(&pdu)?;
    Ok(())
}

fn key_id_matches(received: Option<KeyId>, local: impl FnOnce() -> Option<KeyId>) -> bool {
    match (received, received.and_then(|_| local())) {
        (Some(remote), Some(local)) => bool::from(remote.ct_eq(&local)),
        _ => false,
    }
}

/// Parse an Initial-Key PDU and record what the supplicant declared
///
/// Nothing in the key material is touched unless the whole PDU and its KDE
/// block decode.
pub(crate) fn initial_key_handle(
    ctx: &mut SecProtContext<'_>,
    pdu: &[u8],
) -> Result<(), ProtocolError> {
    let parsed = eapol::parse_pdu(pdu)?;
    let frame = parsed.key_frame().ok_or_else(|| {
        log::info!("not EAPOL-Key packet");
        ProtocolError::NotEapolKey(parsed.header.packet_type)
    })?;
    if frame.key_information.encrypted_key_data {
        log::warn!("encrypted key data from {}", ctx.addrs.remote);
        return Err(ProtocolError::EncryptedKeyData);
    }
    if frame.key_data.is_empty() {
        log::warn!("no KDEs from {}", ctx.addrs.remote);
        return Err(ProtocolError::NoKeyData);
    }
    let kdes = KdeSet::decode(frame.key_data)?;

    let pmk_live = key_id_matches(kdes.pmkid, || ctx.pmkid_generate(true));
    let ptk_live = key_id_matches(kdes.ptkid, || ctx.ptkid_generate(true));
    let role = kdes
        .node_role
        .and_then(NodeRole::from_wire)
        .unwrap_or(NodeRole::Unknown);

    let keys = &mut *ctx.keys;
    keys.pmk_mismatch = !pmk_live;
    keys.ptk_mismatch = !ptk_live;
    keys.gtks.set_gtkl(kdes.gtkl.unwrap_or(0));
    keys.node_role = role;
    keys.lgtks.set_gtkl(kdes.lgtkl.unwrap_or(0));

    log::debug!(
        "Initial-Key from {}: PMK {} PTK {} NR {:?} GTKL {:x} LGTKL {:x}",
        ctx.addrs.remote,
        if pmk_live { "live" } else { "not live" },
        if ptk_live { "live" } else { "not live" },
        role,
        keys.gtks.gtkl(),
        keys.lgtks.gtkl()
    );
    Ok(())
}
