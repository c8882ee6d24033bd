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

//! Tests for EUI-64 addressing and the fixed-layout codec helpers.

use wisun_common::codec::{ensure_capacity, ensure_remaining, get_array};
use wisun_common::{CodecError, Eui64};

#[test]
fn test_eui64_display_format() {
    let addr = Eui64::new([0x02, 0x00, 0x5e, 0x10, 0x00, 0x00, 0x00, 0x01]);
    assert_eq!(addr.to_string(), "02:00:5e:10:00:00:00:01");
}

#[test]
fn test_eui64_from_bytes() {
    let bytes = [1, 2, 3, 4, 5, 6, 7, 8];
    let addr = Eui64::from(bytes);
    assert_eq!(addr, Eui64::new(bytes));
    assert_eq!(addr.as_bytes(), &bytes);
    assert!(Eui64::new([0; 8]) < addr);
}

#[test]
fn test_get_array_consumes_exactly() {
    let mut slice: &[u8] = &[1, 2, 3, 4, 5];
    let head: [u8; 3] = get_array(&mut slice).unwrap();
    assert_eq!(head, [1, 2, 3]);
    assert_eq!(slice, &[4, 5]);
}

#[test]
fn test_get_array_truncated() {
    let mut slice: &[u8] = &[1, 2, 3];
    assert_eq!(
        get_array::<_, 8>(&mut slice),
        Err(CodecError::UnexpectedEnd)
    );
    assert!(ensure_remaining(&slice, 3).is_ok());
}

#[test]
fn test_ensure_capacity_on_short_slice() {
    let mut storage = [0u8; 4];
    let out: &mut [u8] = &mut storage;
    assert_eq!(ensure_capacity(&out, 5), Err(CodecError::BufferFull));
    assert!(ensure_capacity(&out, 4).is_ok());
}
