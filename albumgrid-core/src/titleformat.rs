//! A small title-formatting language for custom grouping and sort keys.
//!
//! - `%field%` substitutes a track field; missing fields render as nothing.
//! - `[ ... ]` is only emitted if at least one field inside it was present.
//! - `'...'` is emitted literally, so `'['` and `'%'` can be written.
//! - `%%` is a literal percent sign.
use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use albumgrid_state::TrackMetadata;

/// Evaluates a title-formatting expression against a track.
pub trait TitleFormatter: Send + Sync {
    /// Returns the formatted string, or why it could not be produced.
    fn evaluate(&self, track: &TrackMetadata, expression: &str) -> Result<String, FormatError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An error produced while compiling or evaluating an expression.
pub enum FormatError {
    /// The expression referenced a field that does not exist.
    UnknownField(String),
    /// A `%` was opened but never closed.
    UnterminatedField,
    /// A `'` was opened but never closed.
    UnterminatedQuote,
    /// `[` and `]` do not pair up.
    UnbalancedBracket,
    /// The expression evaluated to an empty string.
    EmptyResult,
}
impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::UnknownField(name) => write!(f, "unknown field `%{name}%`"),
            FormatError::UnterminatedField => write!(f, "unterminated field reference"),
            FormatError::UnterminatedQuote => write!(f, "unterminated quote"),
            FormatError::UnbalancedBracket => write!(f, "unbalanced brackets"),
            FormatError::EmptyResult => write!(f, "expression evaluated to an empty string"),
        }
    }
}
impl std::error::Error for FormatError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Artist,
    AlbumArtist,
    Album,
    Genre,
    Year,
    Path,
    Filename,
    Directory,
    Rating,
    PlayCount,
}
impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_lowercase().as_str() {
            "title" => Field::Title,
            "artist" => Field::Artist,
            "album artist" | "album_artist" => Field::AlbumArtist,
            "album" => Field::Album,
            "genre" => Field::Genre,
            "year" | "date" => Field::Year,
            "path" => Field::Path,
            "filename" => Field::Filename,
            "directory" => Field::Directory,
            "rating" => Field::Rating,
            "play_count" | "play count" => Field::PlayCount,
            _ => return None,
        })
    }

    fn value(self, track: &TrackMetadata) -> Option<String> {
        let text = |field: &Option<String>| TrackMetadata::text(field).map(str::to_string);
        let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
        match self {
            Field::Title => text(&track.title),
            Field::Artist => text(&track.artist),
            Field::AlbumArtist => track.effective_album_artist().map(str::to_string),
            Field::Album => text(&track.album),
            Field::Genre => text(&track.genre),
            Field::Year => track.year.map(|y| y.to_string()),
            Field::Path => non_empty(track.path.to_str()),
            Field::Filename => non_empty(track.path.file_stem().and_then(|s| s.to_str())),
            Field::Directory => non_empty(
                track
                    .path
                    .parent()
                    .and_then(Path::file_name)
                    .and_then(|s| s.to_str()),
            ),
            Field::Rating => track.rating.filter(|r| *r > 0).map(|r| r.to_string()),
            Field::PlayCount => track.play_count.map(|c| c.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Field),
    Optional(Vec<Segment>),
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    segments: Vec<Segment>,
}
impl Pattern {
    /// Compiles an expression.
    pub fn compile(expression: &str) -> Result<Self, FormatError> {
        let mut stack: Vec<Vec<Segment>> = vec![vec![]];
        let mut chars = expression.chars();

        fn push_literal(segments: &mut Vec<Segment>, c: char) {
            if let Some(Segment::Literal(s)) = segments.last_mut() {
                s.push(c);
            } else {
                segments.push(Segment::Literal(c.to_string()));
            }
        }

        while let Some(c) = chars.next() {
            let current = stack.last_mut().ok_or(FormatError::UnbalancedBracket)?;
            match c {
                '%' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('%') => break,
                            Some(c) => name.push(c),
                            None => return Err(FormatError::UnterminatedField),
                        }
                    }
                    if name.is_empty() {
                        push_literal(current, '%');
                    } else {
                        let field =
                            Field::from_name(&name).ok_or(FormatError::UnknownField(name))?;
                        current.push(Segment::Field(field));
                    }
                }
                '\'' => loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => push_literal(current, c),
                        None => return Err(FormatError::UnterminatedQuote),
                    }
                },
                '[' => stack.push(vec![]),
                ']' => {
                    if stack.len() < 2 {
                        return Err(FormatError::UnbalancedBracket);
                    }
                    let inner = stack.pop().unwrap_or_default();
                    if let Some(parent) = stack.last_mut() {
                        parent.push(Segment::Optional(inner));
                    }
                }
                c => push_literal(current, c),
            }
        }

        if stack.len() != 1 {
            return Err(FormatError::UnbalancedBracket);
        }
        Ok(Self {
            segments: stack.pop().unwrap_or_default(),
        })
    }

    /// Evaluates the pattern, failing if the output is blank.
    pub fn evaluate(&self, track: &TrackMetadata) -> Result<String, FormatError> {
        let mut output = String::new();
        render(&self.segments, track, &mut output);
        let output = output.trim();
        if output.is_empty() {
            Err(FormatError::EmptyResult)
        } else {
            Ok(output.to_string())
        }
    }
}

/// Renders `segments` into `output`, returning whether any field was present.
fn render(segments: &[Segment], track: &TrackMetadata, output: &mut String) -> bool {
    let mut any_present = false;
    for segment in segments {
        match segment {
            Segment::Literal(s) => output.push_str(s),
            Segment::Field(field) => {
                if let Some(value) = field.value(track) {
                    output.push_str(&value);
                    any_present = true;
                }
            }
            Segment::Optional(inner) => {
                let mut section = String::new();
                if render(inner, track, &mut section) {
                    output.push_str(&section);
                    any_present = true;
                }
            }
        }
    }
    any_present
}

/// The default [`TitleFormatter`]. Remembers the last compiled expression, as the same
/// expression is evaluated for every track of a refresh.
#[derive(Default)]
pub struct PatternFormatter {
    last: Mutex<Option<(String, Result<Arc<Pattern>, FormatError>)>>,
}
impl PatternFormatter {
    fn compiled(&self, expression: &str) -> Result<Arc<Pattern>, FormatError> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_expression, compiled)) = last.as_ref()
            && cached_expression == expression
        {
            return compiled.clone();
        }
        let compiled = Pattern::compile(expression).map(Arc::new);
        *last = Some((expression.to_string(), compiled.clone()));
        compiled
    }
}
impl TitleFormatter for PatternFormatter {
    fn evaluate(&self, track: &TrackMetadata, expression: &str) -> Result<String, FormatError> {
        self.compiled(expression)?.evaluate(track)
    }
}
