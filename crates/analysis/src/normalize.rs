//! Text normalization for keyword matching.
//!
//! Lower-cases, strips diacritics, turns punctuation into spaces and
//! collapses whitespace. [`NormalizedText`] also remembers where every
//! normalized character came from so matches can be shown in the original
//! wording.

/// Normalize `text` for matching. Empty input gives an empty string.
pub fn normalize(text: &str) -> String {
    NormalizedText::new(text).into_string()
}

/// Half-open range of normalized character positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedText {
    original: Vec<char>,
    chars: Vec<char>,
    /// `origin[i]` = index in `original` of normalized char `i`.
    origin: Vec<usize>,
}

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        let original: Vec<char> = text.chars().collect();
        let mut chars = Vec::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());
        let mut pending_space: Option<usize> = None;

        for (i, &c) in original.iter().enumerate() {
            for lower in c.to_lowercase() {
                if is_combining_mark(lower) {
                    continue;
                }
                let mut emit = |f: char| {
                    if f.is_alphanumeric() {
                        if let Some(sep) = pending_space.take() {
                            if !chars.is_empty() {
                                chars.push(' ');
                                origin.push(sep);
                            }
                        }
                        chars.push(f);
                        origin.push(i);
                    } else if pending_space.is_none() {
                        pending_space = Some(i);
                    }
                };
                match fold_diacritic(lower) {
                    Folded::One(f) => emit(f),
                    Folded::Many(s) => s.chars().for_each(&mut emit),
                }
            }
        }

        Self { original, chars, origin }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn into_string(self) -> String {
        self.chars.into_iter().collect()
    }

    /// Normalized text covered by `span`.
    pub fn slice(&self, span: Span) -> String {
        self.chars[span.start..span.end].iter().collect()
    }

    /// Occurrences of an already-normalized `needle` starting at a word
    /// boundary. With `allow_prefix` the needle may be the start of a longer
    /// word and the span is extended to the end of that word; otherwise the
    /// needle must end at a word boundary too.
    pub fn find_keyword(&self, needle: &[char], allow_prefix: bool) -> Vec<Span> {
        let hay = &self.chars;
        let mut spans = Vec::new();
        if needle.is_empty() || needle.len() > hay.len() {
            return spans;
        }

        let mut i = 0;
        while i + needle.len() <= hay.len() {
            let at_word_start = i == 0 || !hay[i - 1].is_alphanumeric();
            if at_word_start && hay[i..i + needle.len()] == *needle {
                let mut end = i + needle.len();
                let at_word_end = end == hay.len() || !hay[end].is_alphanumeric();
                if at_word_end || allow_prefix {
                    while end < hay.len() && hay[end].is_alphanumeric() {
                        end += 1;
                    }
                    spans.push(Span { start: i, end });
                    i = end;
                    continue;
                }
            }
            i += 1;
        }
        spans
    }

    /// Window of `window` original characters on each side of `span`,
    /// whitespace-collapsed, with `...` marking truncation.
    pub fn context(&self, span: Span, window: usize) -> String {
        if span.start >= span.end || span.end > self.origin.len() {
            return String::new();
        }
        let orig_start = self.origin[span.start];
        let orig_end = self.origin[span.end - 1] + 1;

        let from = orig_start.saturating_sub(window);
        let to = (orig_end + window).min(self.original.len());

        let fragment: String = self.original[from..to].iter().collect();
        let mut context = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
        if from > 0 {
            context.insert_str(0, "...");
        }
        if to < self.original.len() {
            context.push_str("...");
        }
        context
    }
}

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

enum Folded {
    One(char),
    Many(&'static str),
}

fn fold_diacritic(c: char) -> Folded {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ł' | 'ľ' | 'ĺ' | 'ļ' => 'l',
        'ñ' | 'ń' | 'ň' | 'ņ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' | 'ţ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        'ß' => return Folded::Many("ss"),
        'æ' => return Folded::Many("ae"),
        'œ' => return Folded::Many("oe"),
        other => other,
    };
    Folded::One(base)
}
