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

//! Supplicant side of the Initial-Key exchange
//!
//! ```text
//! Init ─▶ CreateReq ─(create_request)─▶ TxDone ─(tx_status)─▶ Finish ─▶ Finished
//!              └──────────── send failed ─────────────────────▲
//! ```

use super::initial_key_send;
use crate::config::SecProtConfig;
use crate::sec_prot::{
    ProtocolError, ProtocolState, SecProt, SecProtCommon, SecProtContext, SecResult, Step,
    TxFailure, TxStatus,
};

/// Supplicant Initial-Key states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppKeyState {
    Init,
    /// Waiting for `create_request`
    CreateReq,
    /// Waiting for the link layer to report on the sent PDU
    TxDone,
    Finish,
    /// Waiting for the cleanup tick
    Finished,
}

impl ProtocolState for SuppKeyState {
    const INIT: Self = Self::Init;
    const FINISH: Self = Self::Finish;
    const FINISHED: Self = Self::Finished;
}

/// Supplicant Initial-Key protocol instance
#[derive(Debug, Clone)]
pub struct SuppKeySecProt {
    common: SecProtCommon<SuppKeyState>,
}

impl SuppKeySecProt {
    /// Create an instance and run its `Init` state
    pub fn new(config: &SecProtConfig) -> Self {
        let mut prot = Self {
            common: SecProtCommon::new(config),
        };
        prot.init();
        prot
    }

    fn init(&mut self) {
        log::debug!("Initial-key init");
        self.common.set_state(SuppKeyState::CreateReq);
        self.common.start_timer();
    }

    pub fn state(&self) -> SuppKeyState {
        self.common.state()
    }
}

impl SecProt for SuppKeySecProt {
    fn create_request(&mut self, ctx: &mut SecProtContext<'_>) -> Result<(), ProtocolError> {
        if self.common.state() != SuppKeyState::CreateReq {
            return Err(ProtocolError::UnexpectedEvent);
        }
        self.state_machine(ctx);
        Ok(())
    }

    fn tx_status(&mut self, ctx: &mut SecProtContext<'_>, status: TxStatus) {
        if self.common.state() != SuppKeyState::TxDone {
            log::trace!("tx status {:?} ignored in {:?}", status, self.common.state());
            return;
        }
        match status {
            TxStatus::Ok => {}
            TxStatus::NoAck => self.common.set_result(SecResult::TxFailure(TxFailure::NoAck)),
            TxStatus::Unspecified => self
                .common
                .set_result(SecResult::TxFailure(TxFailure::Unspecified)),
        }
        self.state_machine(ctx);
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_>, ticks: u16) {
        if self.common.timeout_handle(ticks) {
            self.state_machine(ctx);
        }
    }

    fn step(&mut self, ctx: &mut SecProtContext<'_>) -> Step {
        match self.common.state() {
            SuppKeyState::Init => {
                self.init();
                Step::Block
            }
            SuppKeyState::CreateReq => {
                ctx.dispatcher.create_conf(self.common.result());
                if let Err(e) = initial_key_send(ctx) {
                    log::warn!("Initial-key send failed: {}", e);
                    self.common.set_result(e.result());
                    self.common.set_state(SuppKeyState::Finish);
                    return Step::Continue;
                }
                self.common.set_state(SuppKeyState::TxDone);
                Step::Block
            }
            SuppKeyState::TxDone => {
                self.common.set_state(SuppKeyState::Finish);
                Step::Continue
            }
            SuppKeyState::Finish => {
                ctx.dispatcher.finished_ind(self.common.result(), None);
                self.common.set_state(SuppKeyState::Finished);
                self.common.arm_finished_timer();
                Step::Block
            }
            SuppKeyState::Finished => {
                if self.common.timer_running() {
                    log::debug!("Initial-key finished");
                    self.common.stop_timer();
                    ctx.dispatcher.finished();
                }
                Step::Block
            }
        }
    }

    fn result(&self) -> SecResult {
        self.common.result()
    }

    fn timer_running(&self) -> bool {
        self.common.timer_running()
    }

    fn is_finished(&self) -> bool {
        self.common.state() == SuppKeyState::Finished
    }
}
