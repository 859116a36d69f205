//! Step name templates and parameter placeholder rendering.
//!
//! A template is a sequence of words, written either as plain text
//! (`"Given the price is PRICE"`) or as an identifier
//! (`"Given_the_price_is_PRICE"`). Each declared parameter is bound to at
//! most one word when the step is built:
//!
//! 1. a word equal to the upper-cased parameter name is replaced by the
//!    quoted value;
//! 2. otherwise a word matching the name ignoring case keeps its text and is
//!    followed by the quoted value; failing that, a name embedded in a longer
//!    word (ignoring case) is replaced in place;
//! 3. otherwise the parameter is appended in a trailing
//!    `[name: "value"]` group.
//!
//! Parameters bind left to right over words not already taken, so several
//! parameters can share one template without disturbing each other. The
//! binding is fixed, which keeps rendering stable when the name is refreshed
//! after evaluation.

use std::fmt;

/// Marker rendered for parameters that have not been evaluated successfully.
pub const UNKNOWN_VALUE: &str = "<?>";

/// Display value of one parameter, ready to be placed into a step name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameParameter {
    value: String,
    evaluated: bool,
}

impl NameParameter {
    /// A successfully formatted parameter value.
    #[must_use]
    pub fn evaluated(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            evaluated: true,
        }
    }

    /// Placeholder for a parameter whose value is not known.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            value: UNKNOWN_VALUE.to_owned(),
            evaluated: false,
        }
    }

    /// Formatted value, or [`UNKNOWN_VALUE`].
    #[must_use]
    pub fn value(&self) -> &str { &self.value }

    /// Whether the value comes from a successful evaluation.
    #[must_use]
    pub fn is_evaluated(&self) -> bool { self.evaluated }
}

impl fmt::Display for NameParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "\"{}\"", self.value) }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Word(String),
    Replaced {
        param: usize,
    },
    Inserted {
        word: String,
        param: usize,
    },
    Embedded {
        prefix: String,
        param: usize,
        suffix: String,
    },
}

/// A step name template with every parameter bound to its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepNameFormat {
    segments: Vec<Segment>,
    appended: Vec<(String, usize)>,
    parameter_count: usize,
}

impl StepNameFormat {
    /// Bind `parameters` (logical names, in declaration order) to `template`.
    #[must_use]
    pub fn bind<S: AsRef<str>>(template: &str, parameters: &[S]) -> Self {
        let mut segments: Vec<Segment> = split_words(template)
            .map(|word| Segment::Word(word.to_owned()))
            .collect();
        let mut appended = Vec::new();

        for (index, name) in parameters.iter().map(AsRef::as_ref).enumerate() {
            if !bind_parameter(&mut segments, name, index) {
                appended.push((name.to_owned(), index));
            }
        }

        Self {
            segments,
            appended,
            parameter_count: parameters.len(),
        }
    }

    /// A template without parameters.
    #[must_use]
    pub fn plain(template: &str) -> Self { Self::bind::<&str>(template, &[]) }

    /// Number of parameters this format expects.
    #[must_use]
    pub fn parameter_count(&self) -> usize { self.parameter_count }

    /// Render the name with every parameter shown as [`UNKNOWN_VALUE`].
    #[must_use]
    pub fn render_unknown(&self) -> String {
        let params = vec![NameParameter::unknown(); self.parameter_count];
        self.render(&params)
    }

    /// Render the name using `params`, indexed by declaration order.
    ///
    /// Missing entries render as [`UNKNOWN_VALUE`].
    #[must_use]
    pub fn render(&self, params: &[NameParameter]) -> String {
        let unknown = NameParameter::unknown();
        let param = |index: usize| params.get(index).unwrap_or(&unknown);

        let mut words: Vec<String> = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Word(word) => word.clone(),
                Segment::Replaced { param: index } => param(*index).to_string(),
                Segment::Inserted { word, param: index } => format!("{word} {}", param(*index)),
                Segment::Embedded {
                    prefix,
                    param: index,
                    suffix,
                } => format!("{prefix}{}{suffix}", param(*index)),
            })
            .collect();

        if !self.appended.is_empty() {
            let group = self
                .appended
                .iter()
                .map(|(name, index)| format!("{name}: {}", param(*index)))
                .collect::<Vec<_>>()
                .join(", ");
            words.push(format!("[{group}]"));
        }

        words.join(" ")
    }
}

fn split_words(template: &str) -> impl Iterator<Item = &str> {
    template
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
}

fn bind_parameter(segments: &mut [Segment], name: &str, index: usize) -> bool {
    if name.is_empty() {
        return false;
    }

    let token = name.to_uppercase();
    if let Some(segment) = segments
        .iter_mut()
        .find(|segment| matches!(segment, Segment::Word(word) if *word == token))
    {
        *segment = Segment::Replaced { param: index };
        return true;
    }

    if let Some(segment) = segments
        .iter_mut()
        .find(|segment| matches!(segment, Segment::Word(word) if word.to_lowercase() == name.to_lowercase()))
    {
        if let Segment::Word(word) = segment {
            *segment = Segment::Inserted {
                word: std::mem::take(word),
                param: index,
            };
        }
        return true;
    }

    for segment in segments.iter_mut() {
        let Segment::Word(word) = segment else {
            continue;
        };
        if let Some((start, end)) = find_ignore_case(word, name) {
            *segment = Segment::Embedded {
                prefix: word[..start].to_owned(),
                param: index,
                suffix: word[end..].to_owned(),
            };
            return true;
        }
    }

    false
}

/// Byte range of the first case-insensitive occurrence of `needle` in
/// `haystack`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle_len = needle.chars().count();
    haystack.char_indices().find_map(|(start, _)| {
        let candidate = &haystack[start..];
        let end = candidate
            .char_indices()
            .nth(needle_len)
            .map_or(candidate.len(), |(offset, _)| offset);
        let window = &candidate[..end];
        (window.chars().count() == needle_len && window.to_lowercase() == needle.to_lowercase())
            .then_some((start, start + end))
    })
}
