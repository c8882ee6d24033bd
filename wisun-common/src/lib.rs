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

#![no_std]

//! Types shared across the Wi-SUN key management crates.
//!
//! This crate holds the pieces that both the key-identifier providers and the
//! KMP protocol engine need: node addressing, a small byte codec trait built
//! on `bytes::{Buf, BufMut}`, and the codec error type.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::Codec;
pub use error::CodecError;
pub use types::Eui64;
