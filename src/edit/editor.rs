//! Offset-indexed editor over an immutable source string

use std::collections::BTreeMap;

use super::source_map::{SourceMap, SourceMapGenerator};
use super::Edit;
use crate::syntax::Span;
use crate::{Error, Result};

/// How the source map for a render should describe its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapOptions {
    /// Name of the generated file
    pub file: Option<String>,
    /// Name of the original file as listed in `sources`
    pub source: String,
    pub include_content: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            file: None,
            source: "input.js".to_string(),
            include_content: true,
        }
    }
}

enum Chunk<'a> {
    Inserted(&'a str),
    Original { offset: usize, text: &'a str },
}

#[derive(Debug)]
pub struct Editor<'s> {
    source: &'s str,
    /// Insertions per offset, in request order
    inserts: BTreeMap<usize, Vec<String>>,
    removals: Vec<Span>,
}

impl<'s> Editor<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            inserts: BTreeMap::new(),
            removals: Vec::new(),
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    /// Insert `text` before the original character at `offset`. Text
    /// inserted earlier at the same offset comes first.
    pub fn append_left(&mut self, offset: usize, text: impl Into<String>) -> Result<()> {
        self.check_offset(offset)?;
        self.inserts.entry(offset).or_default().push(text.into());
        Ok(())
    }

    /// Drop the original text in `start..end`
    pub fn remove(&mut self, start: usize, end: usize) -> Result<()> {
        self.check_offset(start)?;
        self.check_offset(end)?;
        if start > end {
            return Err(Error::Invariant(format!("inverted removal {}..{}", start, end)));
        }
        if start < end {
            self.removals.push(Span::new(start, end));
        }
        Ok(())
    }

    pub fn apply(&mut self, edit: Edit) -> Result<()> {
        match edit {
            Edit::Remove(span) => self.remove(span.start, span.end),
            Edit::Insert { offset, text } => self.append_left(offset, text),
        }
    }

    pub fn apply_all(&mut self, edits: impl IntoIterator<Item = Edit>) -> Result<()> {
        for edit in edits {
            self.apply(edit)?;
        }
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        !self.inserts.is_empty() || !self.removals.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        for chunk in self.chunks() {
            match chunk {
                Chunk::Inserted(text) | Chunk::Original { text, .. } => out.push_str(text),
            }
        }
        out
    }

    /// Render the edited text together with a map back to the original
    pub fn render_with_map(&self, options: &MapOptions) -> (String, SourceMap) {
        let mut generator = SourceMapGenerator::new(options.file.clone());
        let source_index = if options.include_content {
            generator.add_source_with_content(options.source.clone(), self.source.to_string())
        } else {
            generator.add_source(options.source.clone())
        };

        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(self.source.match_indices('\n').map(|(index, _)| index + 1))
            .collect();

        let mut out = String::with_capacity(self.source.len());
        let mut line = 0u32;
        let mut column = 0u32;

        for chunk in self.chunks() {
            match chunk {
                Chunk::Inserted(text) => {
                    for ch in text.chars() {
                        if ch == '\n' {
                            line += 1;
                            column = 0;
                        } else {
                            column += ch.len_utf16() as u32;
                        }
                    }
                    out.push_str(text);
                }
                Chunk::Original { offset, text } => {
                    let original_line = line_starts.partition_point(|start| *start <= offset) - 1;
                    let line_start = line_starts[original_line];
                    let mut original_line = original_line as u32;
                    let original_column = self.source[line_start..offset].encode_utf16().count() as u32;

                    generator.add_simple_mapping(line, column, source_index, original_line, original_column);
                    let mut chars = text.chars().peekable();
                    while let Some(ch) = chars.next() {
                        if ch == '\n' {
                            line += 1;
                            column = 0;
                            original_line += 1;
                            if chars.peek().is_some() {
                                generator.add_simple_mapping(line, 0, source_index, original_line, 0);
                            }
                        } else {
                            column += ch.len_utf16() as u32;
                        }
                    }
                    out.push_str(text);
                }
            }
        }

        (out, generator.finish())
    }

    /// Output pieces in order: insertions at an offset precede the original
    /// text starting there, removed text is skipped.
    fn chunks(&self) -> Vec<Chunk<'_>> {
        let removals = self.merged_removals();

        let mut cuts: Vec<usize> = vec![0, self.source.len()];
        cuts.extend(self.inserts.keys().copied());
        cuts.extend(removals.iter().flat_map(|span| [span.start, span.end]));
        cuts.sort_unstable();
        cuts.dedup();

        let mut chunks = Vec::new();
        let mut removal = 0;
        for (index, &cut) in cuts.iter().enumerate() {
            if let Some(texts) = self.inserts.get(&cut) {
                chunks.extend(texts.iter().map(|text| Chunk::Inserted(text)));
            }
            let Some(&next) = cuts.get(index + 1) else {
                break;
            };
            while removals.get(removal).is_some_and(|span| span.end <= cut) {
                removal += 1;
            }
            let removed = removals
                .get(removal)
                .is_some_and(|span| span.start <= cut && cut < span.end);
            if !removed && next > cut {
                chunks.push(Chunk::Original {
                    offset: cut,
                    text: &self.source[cut..next],
                });
            }
        }
        chunks
    }

    fn merged_removals(&self) -> Vec<Span> {
        let mut sorted = self.removals.clone();
        sorted.sort_unstable();
        let mut merged: Vec<Span> = Vec::with_capacity(sorted.len());
        for span in sorted {
            match merged.last_mut() {
                Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
                _ => merged.push(span),
            }
        }
        merged
    }

    fn check_offset(&self, offset: usize) -> Result<()> {
        if offset > self.source.len() || !self.source.is_char_boundary(offset) {
            return Err(Error::Invariant(format!(
                "edit offset {} is not a character boundary of a {} byte source",
                offset,
                self.source.len()
            )));
        }
        Ok(())
    }
}
