use serde::{Deserialize, Serialize};
use thiserror::Error;

const BASE64_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const VLQ_SHIFT: u32 = 5;
const VLQ_CONTINUATION: i64 = 0x20;
const VLQ_MASK: i64 = 0x1F;

#[derive(Debug, Error)]
pub enum SourceMapError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported source map version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid base64 character '{ch}' on generated line {line}")]
    InvalidBase64 { ch: char, line: usize },

    #[error("mappings end inside a VLQ value on generated line {line}")]
    UnterminatedVlq { line: usize },

    #[error("VLQ value out of range on generated line {line}")]
    VlqOverflow { line: usize },

    #[error("segment with {fields} fields on generated line {line}")]
    BadSegment { fields: usize, line: usize },

    #[error("negative {what} on generated line {line}")]
    NegativeValue { what: &'static str, line: usize },

    #[error("source index {index} out of range ({len} sources)")]
    SourceOutOfRange { index: u32, len: usize },

    #[error("name index {index} out of range ({len} names)")]
    NameOutOfRange { index: u32, len: usize },
}

/// The JSON structure of a Source Map v3 document.
///
/// Keys this model does not know about (`x_google_ignoreList`, ...) are kept in
/// `extensions` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<Option<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
    #[serde(flatten)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

/// A single decoded segment. Lines and columns are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub original: Option<OriginalPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: u32,
    pub line: u32,
    pub column: u32,
    pub name: Option<u32>,
}

impl SourceMap {
    pub fn from_json(json: &str) -> Result<Self, SourceMapError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SourceMapError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode the `mappings` field, validating every segment against `sources` and `names`.
    pub fn decode(&self) -> Result<Vec<Mapping>, SourceMapError> {
        if self.version != 3 {
            return Err(SourceMapError::UnsupportedVersion(self.version));
        }

        let mut mappings = Vec::new();
        let mut fields = Vec::with_capacity(5);
        let mut source = 0i64;
        let mut original_line = 0i64;
        let mut original_column = 0i64;
        let mut name = 0i64;

        for (line, text) in self.mappings.split(';').enumerate() {
            let generated_line = to_u32(line as i64, "generated line", line)?;
            let mut generated_column = 0i64;

            for segment in text.split(',').filter(|segment| !segment.is_empty()) {
                fields.clear();
                decode_segment(segment, line, &mut fields)?;

                generated_column += fields[0];
                let mut mapping = Mapping {
                    generated_line,
                    generated_column: to_u32(generated_column, "generated column", line)?,
                    original: None,
                };

                match fields.len() {
                    1 => {}
                    4 | 5 => {
                        source += fields[1];
                        original_line += fields[2];
                        original_column += fields[3];

                        let source_index = to_u32(source, "source index", line)?;
                        if source_index as usize >= self.sources.len() {
                            return Err(SourceMapError::SourceOutOfRange {
                                index: source_index,
                                len: self.sources.len(),
                            });
                        }

                        let name_index = if fields.len() == 5 {
                            name += fields[4];
                            let index = to_u32(name, "name index", line)?;
                            if index as usize >= self.names.len() {
                                return Err(SourceMapError::NameOutOfRange {
                                    index,
                                    len: self.names.len(),
                                });
                            }
                            Some(index)
                        } else {
                            None
                        };

                        mapping.original = Some(OriginalPosition {
                            source: source_index,
                            line: to_u32(original_line, "original line", line)?,
                            column: to_u32(original_column, "original column", line)?,
                            name: name_index,
                        });
                    }
                    fields => return Err(SourceMapError::BadSegment { fields, line }),
                }

                mappings.push(mapping);
            }
        }

        Ok(mappings)
    }
}

fn to_u32(value: i64, what: &'static str, line: usize) -> Result<u32, SourceMapError> {
    if value < 0 {
        return Err(SourceMapError::NegativeValue { what, line });
    }
    u32::try_from(value).map_err(|_| SourceMapError::VlqOverflow { line })
}

fn base64_value(ch: char) -> Option<i64> {
    BASE64_CHARS
        .iter()
        .position(|&c| c as char == ch)
        .map(|index| index as i64)
}

/// Decode every Base64 VLQ value of one segment into `out`.
fn decode_segment(segment: &str, line: usize, out: &mut Vec<i64>) -> Result<(), SourceMapError> {
    let mut value = 0i64;
    let mut shift = 0u32;

    for ch in segment.chars() {
        let digit = base64_value(ch).ok_or(SourceMapError::InvalidBase64 { ch, line })?;
        if shift > 30 {
            return Err(SourceMapError::VlqOverflow { line });
        }
        value += (digit & VLQ_MASK) << shift;

        if digit & VLQ_CONTINUATION != 0 {
            shift += VLQ_SHIFT;
        } else {
            let magnitude = value >> 1;
            out.push(if value & 1 == 1 { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        }
    }

    if shift != 0 {
        return Err(SourceMapError::UnterminatedVlq { line });
    }
    Ok(())
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = vlq & VLQ_MASK;
        vlq >>= VLQ_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION;
        }
        out.push(BASE64_CHARS[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Encode decoded segments back into a `mappings` string. Segments must be
/// ordered by generated line.
pub fn encode_mappings(mappings: &[Mapping]) -> String {
    let mut result = String::new();
    let mut line = 0u32;
    let mut first_in_line = true;
    let mut prev_column = 0i64;
    let mut prev_source = 0i64;
    let mut prev_original_line = 0i64;
    let mut prev_original_column = 0i64;
    let mut prev_name = 0i64;

    for mapping in mappings {
        while line < mapping.generated_line {
            result.push(';');
            line += 1;
            prev_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            result.push(',');
        }
        first_in_line = false;

        encode_vlq(&mut result, mapping.generated_column as i64 - prev_column);
        prev_column = mapping.generated_column as i64;

        if let Some(original) = mapping.original {
            encode_vlq(&mut result, original.source as i64 - prev_source);
            prev_source = original.source as i64;
            encode_vlq(&mut result, original.line as i64 - prev_original_line);
            prev_original_line = original.line as i64;
            encode_vlq(&mut result, original.column as i64 - prev_original_column);
            prev_original_column = original.column as i64;

            if let Some(name) = original.name {
                encode_vlq(&mut result, name as i64 - prev_name);
                prev_name = name as i64;
            }
        }
    }

    result
}

/// A validated source map together with its decoded segments.
#[derive(Debug, Clone)]
pub struct SourceMapConsumer {
    map: SourceMap,
    mappings: Vec<Mapping>,
}

impl SourceMapConsumer {
    pub fn new(map: SourceMap) -> Result<Self, SourceMapError> {
        let mappings = map.decode()?;
        Ok(Self { map, mappings })
    }

    /// Original position of a generated position: the closest segment at or
    /// before `column` on the same line. `None` when the position is unmapped.
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        self.mappings
            .iter()
            .filter(|m| m.generated_line == line && m.generated_column <= column)
            .max_by_key(|m| m.generated_column)
            .and_then(|m| m.original)
    }
}

/// Appends unmapped text after content that already has a source map.
///
/// Segments inside the content are carried over unchanged. Segments on lines
/// past the end of the content are dropped, and appended text gets none.
#[derive(Debug)]
pub struct SourceMapExtender {
    code: String,
    consumer: SourceMapConsumer,
}

impl SourceMapExtender {
    pub fn new(content: &str, map: &SourceMap) -> Result<Self, SourceMapError> {
        let mut consumer = SourceMapConsumer::new(map.clone())?;
        let content_lines = content.split('\n').count();
        consumer
            .mappings
            .retain(|m| (m.generated_line as usize) < content_lines);

        Ok(Self {
            code: content.to_string(),
            consumer,
        })
    }

    pub fn append(&mut self, text: &str) {
        self.code.push_str(text);
    }

    /// Returns the combined code and its map, declaring `file` as the output file.
    pub fn finish(self, file: impl Into<String>) -> (String, SourceMap) {
        let SourceMapConsumer { mut map, mappings } = self.consumer;
        map.mappings = encode_mappings(&mappings);
        map.file = Some(file.into());
        (self.code, map)
    }
}
