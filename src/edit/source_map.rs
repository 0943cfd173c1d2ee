//! Version 3 source maps
//!
//! The editor feeds mappings in generated order to a
//! [`SourceMapGenerator`], which encodes them as base64 VLQ segments.
//! Lines and columns are zero-based; columns count UTF-16 code units.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Base64 VLQ as used by the `mappings` field
pub mod vlq {
    const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    const CONTINUATION: u32 = 0b10_0000;
    const DIGIT_MASK: u32 = 0b1_1111;

    pub fn encode(value: i32) -> String {
        let mut out = String::new();
        encode_into(value, &mut out);
        out
    }

    pub fn encode_into(value: i32, out: &mut String) {
        // Sign goes in the least significant bit
        let mut remaining = if value < 0 {
            ((value.unsigned_abs()) << 1) | 1
        } else {
            (value as u32) << 1
        };
        loop {
            let mut digit = remaining & DIGIT_MASK;
            remaining >>= 5;
            if remaining > 0 {
                digit |= CONTINUATION;
            }
            out.push(BASE64[digit as usize] as char);
            if remaining == 0 {
                break;
            }
        }
    }

    /// Decode one value. Returns the value and the number of bytes read.
    pub fn decode(input: &str) -> Option<(i32, usize)> {
        let mut result: u32 = 0;
        let mut shift = 0;
        for (index, byte) in input.bytes().enumerate() {
            let digit = BASE64.iter().position(|b| *b == byte)? as u32;
            result |= (digit & DIGIT_MASK).checked_shl(shift)?;
            if digit & CONTINUATION == 0 {
                let magnitude = (result >> 1) as i32;
                let value = if result & 1 == 1 { -magnitude } else { magnitude };
                return Some((value, index + 1));
            }
            shift += 5;
        }
        None
    }
}

/// Serialized source map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Display for SourceMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    generated_line: u32,
    generated_column: u32,
    source: u32,
    original_line: u32,
    original_column: u32,
}

/// Collects mappings and renders a [`SourceMap`]
#[derive(Debug, Default)]
pub struct SourceMapGenerator {
    file: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    mappings: Vec<Mapping>,
}

impl SourceMapGenerator {
    pub fn new(file: Option<String>) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    pub fn add_source(&mut self, name: String) -> u32 {
        self.sources.push(name);
        self.sources_content.push(None);
        (self.sources.len() - 1) as u32
    }

    pub fn add_source_with_content(&mut self, name: String, content: String) -> u32 {
        let index = self.add_source(name);
        self.sources_content[index as usize] = Some(content);
        index
    }

    /// Record a mapping. Mappings must arrive in generated order.
    pub fn add_simple_mapping(
        &mut self,
        generated_line: u32,
        generated_column: u32,
        source: u32,
        original_line: u32,
        original_column: u32,
    ) {
        let mapping = Mapping {
            generated_line,
            generated_column,
            source,
            original_line,
            original_column,
        };
        if self.mappings.last() != Some(&mapping) {
            self.mappings.push(mapping);
        }
    }

    pub fn finish(self) -> SourceMap {
        let mappings = self.encode_mappings();
        let sources_content = if self.sources_content.iter().any(Option::is_some) {
            Some(self.sources_content)
        } else {
            None
        };
        SourceMap {
            version: 3,
            file: self.file,
            sources: self.sources,
            sources_content,
            names: Vec::new(),
            mappings,
        }
    }

    fn encode_mappings(&self) -> String {
        let mut out = String::new();
        let mut line = 0;
        let mut previous_column = 0i64;
        let mut previous_source = 0i64;
        let mut previous_original_line = 0i64;
        let mut previous_original_column = 0i64;
        let mut first_on_line = true;

        for mapping in &self.mappings {
            while line < mapping.generated_line {
                out.push(';');
                line += 1;
                previous_column = 0;
                first_on_line = true;
            }
            if !first_on_line {
                out.push(',');
            }
            first_on_line = false;

            let fields = [
                (mapping.generated_column as i64, &mut previous_column),
                (mapping.source as i64, &mut previous_source),
                (mapping.original_line as i64, &mut previous_original_line),
                (mapping.original_column as i64, &mut previous_original_column),
            ];
            for (value, previous) in fields {
                vlq::encode_into((value - *previous) as i32, &mut out);
                *previous = value;
            }
        }
        out
    }
}
