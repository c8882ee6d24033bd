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

//! Fixed-layout byte codec.
//!
//! Every wire structure in the KMP layer has a length that is known before
//! writing it, so encoders check the available space up front and never
//! partially write a structure.

use bytes::{Buf, BufMut};

use crate::CodecError;

/// Coding result type.
pub type Result<T> = core::result::Result<T, CodecError>;

/// Trait for encoding and decoding fixed-layout wire structures.
pub trait Codec: Sized {
    /// Number of bytes `encode` will write.
    fn encoded_len(&self) -> usize;

    /// Decode a value from the provided buffer.
    fn decode<B: Buf>(buf: &mut B) -> Result<Self>;

    /// Encode this value into the provided buffer.
    ///
    /// Fails with `CodecError::BufferFull` without writing anything when the
    /// buffer cannot hold `encoded_len()` bytes.
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()>;
}

/// Fail with `UnexpectedEnd` unless `buf` still holds `len` bytes.
pub fn ensure_remaining<B: Buf>(buf: &B, len: usize) -> Result<()> {
    if buf.remaining() < len {
        return Err(CodecError::UnexpectedEnd);
    }
    Ok(())
}

/// Fail with `BufferFull` unless `buf` can take `len` more bytes.
pub fn ensure_capacity<B: BufMut>(buf: &B, len: usize) -> Result<()> {
    if buf.remaining_mut() < len {
        return Err(CodecError::BufferFull);
    }
    Ok(())
}

/// Read a fixed-size byte array.
pub fn get_array<B: Buf, const N: usize>(buf: &mut B) -> Result<[u8; N]> {
    ensure_remaining(buf, N)?;
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}
