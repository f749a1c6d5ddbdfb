// Copyright 2025 The Drasi Authors.
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

use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP protocol version negotiated on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum HttpVersion {
    #[default]
    Unknown = 0,
    Http1_0 = 1,
    Http1_1 = 2,
    Http2 = 3,
}

impl HttpVersion {
    /// Map the engine's raw enumeration value. Unrecognised values are
    /// [`HttpVersion::Unknown`].
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => HttpVersion::Http1_0,
            2 => HttpVersion::Http1_1,
            3 => HttpVersion::Http2,
            _ => HttpVersion::Unknown,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpVersion::Unknown => "unknown",
            HttpVersion::Http1_0 => "HTTP/1.0",
            HttpVersion::Http1_1 => "HTTP/1.1",
            HttpVersion::Http2 => "HTTP/2",
        };
        f.write_str(name)
    }
}
