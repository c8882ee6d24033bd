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

//! Common types shared across the key management layers.

/// Length of an IEEE EUI-64 address
pub const EUI64_LEN: usize = 8;

/// IEEE EUI-64 MAC address of a mesh node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Eui64(pub [u8; EUI64_LEN]);

impl Eui64 {
    /// Create an address from its raw bytes
    pub const fn new(bytes: [u8; EUI64_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; EUI64_LEN] {
        &self.0
    }
}

impl From<[u8; EUI64_LEN]> for Eui64 {
    fn from(bytes: [u8; EUI64_LEN]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for Eui64 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
