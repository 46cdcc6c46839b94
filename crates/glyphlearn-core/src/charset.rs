//! Working alphabet and per-class properties
//!
//! A [`ClassTable`] maps class ids to their text and to the properties the
//! classifier consults while scoring: alpha/digit membership, whether the
//! class is enabled for output, whether it is a fragment of a larger
//! character, and the vertical band its glyphs have been observed in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::ClassId;

/// Predefined character sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharsetType {
    /// Character set type is not specified
    #[default]
    Unknown = 0,
    /// Arabic numerals: 0-9 (10 characters)
    ArabicNumerals = 1,
    /// Lowercase Roman numerals: i, v, x, l, c, d, m (7 characters)
    LcRomanNumerals = 2,
    /// Uppercase Roman numerals: I, V, X, L, C, D, M (7 characters)
    UcRomanNumerals = 3,
    /// Lowercase letters: a-z (26 characters)
    LcAlpha = 4,
    /// Uppercase letters: A-Z (26 characters)
    UcAlpha = 5,
    /// Common punctuation marks (16 characters)
    Punctuation = 6,
}

impl CharsetType {
    /// Returns the characters in this charset
    pub fn characters(&self) -> &'static [char] {
        match self {
            CharsetType::Unknown => &[],
            CharsetType::ArabicNumerals => &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'],
            CharsetType::LcRomanNumerals => &['i', 'v', 'x', 'l', 'c', 'd', 'm'],
            CharsetType::UcRomanNumerals => &['I', 'V', 'X', 'L', 'C', 'D', 'M'],
            CharsetType::LcAlpha => &[
                'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
                'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
            ],
            CharsetType::UcAlpha => &[
                'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P',
                'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
            ],
            CharsetType::Punctuation => &[
                '.', ',', ';', ':', '/', '`', '~', '\'', '-', '=', '\\', '|', '"', '!', '_', '^',
            ],
        }
    }
}

/// Observed vertical extent of a class in normalized space
///
/// Bottoms and tops are on a 0..=255 scale where the baseline is
/// [`crate::BLN_BASELINE_OFFSET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopBottom {
    pub min_bottom: i32,
    pub max_bottom: i32,
    pub min_top: i32,
    pub max_top: i32,
}

impl TopBottom {
    /// The permissive range: anything fits
    pub const ANY: TopBottom = TopBottom {
        min_bottom: 0,
        max_bottom: 255,
        min_top: 0,
        max_top: 255,
    };

    /// Returns true if a glyph spanning `bottom..top` lies inside the range
    pub fn contains(&self, bottom: i32, top: i32) -> bool {
        bottom >= self.min_bottom
            && bottom <= self.max_bottom
            && top >= self.min_top
            && top <= self.max_top
    }
}

impl Default for TopBottom {
    fn default() -> Self {
        Self::ANY
    }
}

/// A piece of a character split across several blobs
///
/// Text form is `|c|i|n` (piece `i` of `n` of `c`), or `|cni|n` when the
/// split was natural (the character really is drawn in several pieces).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fragment {
    pub unichar: String,
    pub pos: usize,
    pub total: usize,
    pub natural: bool,
}

impl Fragment {
    pub const SEPARATOR: char = '|';
    pub const NATURAL: char = 'n';

    pub fn new(unichar: impl Into<String>, pos: usize, total: usize, natural: bool) -> Self {
        Self {
            unichar: unichar.into(),
            pos,
            total,
            natural,
        }
    }

    /// Formats the fragment as class text
    pub fn to_text(&self) -> String {
        let mid = if self.natural {
            Self::NATURAL
        } else {
            Self::SEPARATOR
        };
        format!(
            "{sep}{}{mid}{}{sep}{}",
            self.unichar,
            self.pos,
            self.total,
            sep = Self::SEPARATOR
        )
    }

    /// Parses class text; returns `Ok(None)` for text that is not a fragment
    pub fn parse(text: &str) -> Result<Option<Fragment>> {
        let Some(rest) = text.strip_prefix(Self::SEPARATOR) else {
            return Ok(None);
        };
        if rest.is_empty() {
            // a lone separator is an ordinary character
            return Ok(None);
        }
        let mut chars = rest.chars();
        let unichar = chars
            .next()
            .ok_or_else(|| Error::InvalidFragment(text.to_string()))?;
        let tail: String = chars.collect();
        let (natural, body) = if let Some(b) = tail.strip_prefix(Self::NATURAL) {
            (true, b)
        } else if let Some(b) = tail.strip_prefix(Self::SEPARATOR) {
            (false, b)
        } else {
            return Err(Error::InvalidFragment(text.to_string()));
        };
        let (pos, total) = body
            .split_once(Self::SEPARATOR)
            .ok_or_else(|| Error::InvalidFragment(text.to_string()))?;
        let pos: usize = pos
            .parse()
            .map_err(|_| Error::InvalidFragment(text.to_string()))?;
        let total: usize = total
            .parse()
            .map_err(|_| Error::InvalidFragment(text.to_string()))?;
        if total < 2 || pos >= total {
            return Err(Error::InvalidFragment(text.to_string()));
        }
        Ok(Some(Fragment::new(unichar.to_string(), pos, total, natural)))
    }
}

/// Properties of one class in the working alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassProperties {
    pub text: String,
    pub is_alpha: bool,
    pub is_digit: bool,
    /// Disabled classes are matched but never reported
    pub enabled: bool,
    pub fragment: Option<Fragment>,
    pub top_bottom: TopBottom,
}

impl ClassProperties {
    fn from_text(text: &str, fragment: Option<Fragment>) -> Self {
        let mut chars = text.chars();
        let (is_alpha, is_digit) = match (chars.next(), chars.next(), &fragment) {
            (Some(c), None, None) => (c.is_alphabetic(), c.is_ascii_digit()),
            _ => (false, false),
        };
        Self {
            text: text.to_string(),
            is_alpha,
            is_digit,
            enabled: true,
            fragment,
            top_bottom: TopBottom::ANY,
        }
    }
}

/// The working alphabet
///
/// Id 0 is reserved for [`ClassId::NONE`] (a space) and is never an
/// alpha or digit class.
#[derive(Debug, Clone)]
pub struct ClassTable {
    classes: Vec<ClassProperties>,
    by_text: HashMap<String, ClassId>,
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassTable {
    /// Creates a table holding only the NONE class
    pub fn new() -> Self {
        let mut table = Self {
            classes: Vec::new(),
            by_text: HashMap::new(),
        };
        table.classes.push(ClassProperties::from_text(" ", None));
        table.by_text.insert(" ".to_string(), ClassId::NONE);
        table
    }

    /// Creates a table holding the characters of several charsets
    pub fn with_charsets(charsets: &[CharsetType]) -> Result<Self> {
        let mut table = Self::new();
        for charset in charsets {
            for c in charset.characters() {
                table.add(&c.to_string())?;
            }
        }
        Ok(table)
    }

    /// Adds a class, returning its id. Adding existing text returns the
    /// existing id.
    pub fn add(&mut self, text: &str) -> Result<ClassId> {
        if let Some(&id) = self.by_text.get(text) {
            return Ok(id);
        }
        if text.is_empty() {
            return Err(Error::InvalidParameter("empty class text".to_string()));
        }
        let id = u16::try_from(self.classes.len())
            .map(ClassId)
            .map_err(|_| Error::InvalidParameter("class table is full".to_string()))?;
        let fragment = Fragment::parse(text)?;
        self.classes.push(ClassProperties::from_text(text, fragment));
        self.by_text.insert(text.to_string(), id);
        Ok(id)
    }

    /// Number of classes including NONE
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// A table always holds NONE, so this is never true
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns true if the id refers to a class in the table
    #[inline]
    pub fn is_legal(&self, id: ClassId) -> bool {
        id.index() < self.classes.len()
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassProperties> {
        self.classes.get(id.index())
    }

    /// Looks up the id for class text
    pub fn id_of(&self, text: &str) -> Result<ClassId> {
        self.by_text
            .get(text)
            .copied()
            .ok_or_else(|| Error::UnknownClass(text.to_string()))
    }

    /// Class text, or `""` for unknown ids
    pub fn text(&self, id: ClassId) -> &str {
        self.get(id).map_or("", |p| p.text.as_str())
    }

    pub fn is_alpha(&self, id: ClassId) -> bool {
        self.get(id).is_some_and(|p| p.is_alpha)
    }

    pub fn is_digit(&self, id: ClassId) -> bool {
        self.get(id).is_some_and(|p| p.is_digit)
    }

    pub fn is_fragment(&self, id: ClassId) -> bool {
        self.get(id).is_some_and(|p| p.fragment.is_some())
    }

    pub fn fragment(&self, id: ClassId) -> Option<&Fragment> {
        self.get(id).and_then(|p| p.fragment.as_ref())
    }

    pub fn is_enabled(&self, id: ClassId) -> bool {
        self.get(id).is_some_and(|p| p.enabled)
    }

    /// Enables or disables a class for output
    pub fn set_enabled(&mut self, id: ClassId, enabled: bool) -> Result<()> {
        self.property_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Enables or disables every fragment class
    pub fn set_fragments_enabled(&mut self, enabled: bool) {
        for p in self.classes.iter_mut().filter(|p| p.fragment.is_some()) {
            p.enabled = enabled;
        }
    }

    /// Returns true if any fragment class is enabled
    pub fn has_enabled_fragments(&self) -> bool {
        self.classes.iter().any(|p| p.fragment.is_some() && p.enabled)
    }

    pub fn top_bottom(&self, id: ClassId) -> TopBottom {
        self.get(id).map_or(TopBottom::ANY, |p| p.top_bottom)
    }

    pub fn set_top_bottom(&mut self, id: ClassId, range: TopBottom) -> Result<()> {
        self.property_mut(id)?.top_bottom = range;
        Ok(())
    }

    fn property_mut(&mut self, id: ClassId) -> Result<&mut ClassProperties> {
        let len = self.classes.len();
        self.classes.get_mut(id.index()).ok_or(Error::IndexOutOfBounds {
            index: id.index(),
            len,
        })
    }

    /// Iterates over every class id, NONE included
    pub fn ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(|i| ClassId(i as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_properties() {
        let table =
            ClassTable::with_charsets(&[CharsetType::ArabicNumerals, CharsetType::LcAlpha])
                .unwrap();
        assert_eq!(table.len(), 1 + 10 + 26);
        let one = table.id_of("1").unwrap();
        let l = table.id_of("l").unwrap();
        assert!(table.is_digit(one));
        assert!(!table.is_alpha(one));
        assert!(table.is_alpha(l));
        assert!(!table.is_alpha(ClassId::NONE));
        assert_eq!(table.text(l), "l");
        assert!(table.id_of("?").is_err());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut table = ClassTable::new();
        let a = table.add("a").unwrap();
        assert_eq!(table.add("a").unwrap(), a);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_fragment_text() {
        let f = Fragment::new("m", 1, 3, false);
        assert_eq!(f.to_text(), "|m|1|3");
        assert_eq!(Fragment::parse("|m|1|3").unwrap(), Some(f));

        let n = Fragment::new("i", 0, 2, true);
        assert_eq!(n.to_text(), "|in0|2");
        assert_eq!(Fragment::parse("|in0|2").unwrap(), Some(n));

        assert_eq!(Fragment::parse("m").unwrap(), None);
        assert_eq!(Fragment::parse("|").unwrap(), None);
        assert!(Fragment::parse("|m|3|3").is_err());
        assert!(Fragment::parse("|mx1|3").is_err());
    }

    #[test]
    fn test_fragment_classes() {
        let mut table = ClassTable::new();
        let frag = table.add("|m|0|2").unwrap();
        assert!(table.is_fragment(frag));
        assert!(!table.is_alpha(frag));
        let m = table.add("m").unwrap();
        table.set_fragments_enabled(false);
        assert!(!table.is_enabled(frag));
        assert!(table.is_enabled(m));
        assert!(!table.has_enabled_fragments());
        table.set_fragments_enabled(true);
        assert!(table.has_enabled_fragments());
    }

    #[test]
    fn test_top_bottom() {
        let mut table = ClassTable::new();
        let dot = table.add(".").unwrap();
        let range = TopBottom {
            min_bottom: 60,
            max_bottom: 70,
            min_top: 70,
            max_top: 90,
        };
        table.set_top_bottom(dot, range).unwrap();
        assert!(table.top_bottom(dot).contains(64, 80));
        assert!(!table.top_bottom(dot).contains(64, 190));
        assert!(table.set_top_bottom(ClassId(99), range).is_err());
    }
}
