//! Character set handling for reading and writing.
//!
//! Documents are always held as Rust strings. A [`Charset`] describes the
//! repertoire the caller wants: on read, strings are normalized and
//! transliterated into that repertoire (lossy); on write, characters outside
//! it are emitted as numeric character references (lossless).

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static UC_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\u{2010}\u{2012}\u{2013}\u{2014}\u{2015}\u{2212}]").unwrap());
static UC_SQUO: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[\u{2018}\u{2019}\u{201a}\u{2032}\u{02b9}\u{2039}\u{203a}]").unwrap()
});
static UC_DQUO: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\u{201c}\u{201d}\u{201e}\u{2033}\u{02ba}]").unwrap());
static UC_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\u{2022}\u{2020}\u{2021}]").unwrap());

/// Replacement text for a character the target repertoire cannot hold.
pub type Transliterator = fn(char) -> Option<&'static str>;

/// Target repertoire for string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Keep strings as they are; write non-ASCII as character references.
    Unicode,
    /// Keep strings as they are; write them as raw UTF-8.
    Utf8,
    /// ISO-8859-1/15 repertoire.
    Latin1,
    /// 7-bit ASCII repertoire.
    Ascii,
}

impl Default for Charset {
    fn default() -> Self {
        Charset::Unicode
    }
}

impl Charset {
    /// Resolve a free-form encoding name (`utf8`, `UTF-8`, `latin1`,
    /// `ISO-8859-15`, `cp850`, `ascii`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let norm = name.to_ascii_uppercase().replace(['-', '_'], "");
        match norm.as_str() {
            "UTF8" => Some(Charset::Utf8),
            "ISO88591" | "ISO885915" | "LATIN1" | "LATIN9" | "CP850" => Some(Charset::Latin1),
            "ASCII" | "USASCII" => Some(Charset::Ascii),
            "UNICODE" => Some(Charset::Unicode),
            _ => None,
        }
    }

    /// Name used in the XML declaration.
    pub fn xml_name(&self) -> &'static str {
        // Output bytes are always UTF-8; other repertoires only restrict
        // which characters are written literally.
        "UTF-8"
    }

    /// Largest code point written literally on output.
    fn literal_limit(&self) -> u32 {
        match self {
            Charset::Utf8 => u32::MAX,
            Charset::Latin1 => 0xff,
            Charset::Unicode | Charset::Ascii => 0x7f,
        }
    }

    /// Apply the read-side transform with the default transliteration table.
    pub fn decode<'a>(&self, value: &'a str) -> Cow<'a, str> {
        self.decode_with(value, default_transliteration)
    }

    /// Apply the read-side transform with a caller-supplied table.
    pub fn decode_with<'a>(&self, value: &'a str, table: Transliterator) -> Cow<'a, str> {
        let limit = match self {
            Charset::Unicode | Charset::Utf8 => return Cow::Borrowed(value),
            Charset::Latin1 => 0xff,
            Charset::Ascii => 0x7f,
        };
        let normalized = normalize_punctuation(value);
        if normalized.chars().all(|c| (c as u32) <= limit) {
            return normalized;
        }
        let mut out = String::with_capacity(normalized.len());
        for c in normalized.chars() {
            if (c as u32) <= limit {
                out.push(c);
            } else if let Some(rep) = table(c) {
                out.push_str(rep);
            } else if let Some(rep) = default_transliteration(c) {
                out.push_str(rep);
            }
        }
        Cow::Owned(out)
    }

    /// Escape a value for use inside a double-quoted XML attribute.
    pub fn escape_attr<'a>(&self, value: &'a str) -> Cow<'a, str> {
        let escaped = quick_xml::escape::escape(value);
        let limit = self.literal_limit();
        if escaped.chars().all(|c| (c as u32) <= limit) {
            return escaped;
        }
        let mut out = String::with_capacity(escaped.len() + 16);
        for c in escaped.chars() {
            if (c as u32) <= limit {
                out.push(c);
            } else {
                out.push_str(&format!("&#{};", c as u32));
            }
        }
        Cow::Owned(out)
    }
}

/// Map typographic dashes, quotes and bullets to their ASCII counterparts.
pub fn normalize_punctuation(value: &str) -> Cow<'_, str> {
    if value.is_ascii() {
        return Cow::Borrowed(value);
    }
    let s = UC_DASH.replace_all(value, "-");
    let s = UC_SQUO.replace_all(&s, "'").into_owned();
    let s = UC_DQUO.replace_all(&s, "\"").into_owned();
    let s = UC_BULLET.replace_all(&s, "*").into_owned();
    Cow::Owned(s)
}

/// Default transliteration for characters outside Latin-1 or ASCII.
pub fn default_transliteration(c: char) -> Option<&'static str> {
    let rep = match c {
        'Ä' => "A",
        'Ö' => "O",
        'Ü' => "U",
        'ä' => "a",
        'ö' => "o",
        'ü' => "u",
        'ß' => "ss",
        'À' | 'Á' | 'Â' | 'Ã' | 'Å' => "A",
        'à' | 'á' | 'â' | 'ã' | 'å' => "a",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' => "O",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'Ù' | 'Ú' | 'Û' => "U",
        'ù' | 'ú' | 'û' => "u",
        'Ç' => "C",
        'ç' => "c",
        'Ñ' => "N",
        'ñ' => "n",
        '°' => "deg",
        '€' => "EUR",
        '\u{00a0}' => " ",
        '（' => "(",
        '）' => ")",
        '︵' => "(",
        '︶' => ")",
        '□' | '■' => "#",
        '─' | '━' | '═' => "-",
        '│' | '┃' | '║' => "|",
        '┌' | '┐' | '└' | '┘' | '┏' | '┓' | '┗' | '┛' | '┻' | '┳' | '╋' | '┼' | '╯' | '╰'
        | '╭' | '╮' => "+",
        '…' => "...",
        _ => return None,
    };
    Some(rep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Charset::from_name("utf-8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_name("UTF8"), Some(Charset::Utf8));
        assert_eq!(Charset::from_name("latin1"), Some(Charset::Latin1));
        assert_eq!(Charset::from_name("ISO-8859-15"), Some(Charset::Latin1));
        assert_eq!(Charset::from_name("ascii"), Some(Charset::Ascii));
        assert_eq!(Charset::from_name("koi8-r"), None);
    }

    #[test]
    fn test_unicode_is_identity() {
        let s = "Ümläüts “non”-ISO";
        assert_eq!(Charset::Unicode.decode(s), s);
        assert_eq!(Charset::Utf8.decode(s), s);
    }

    #[test]
    fn test_latin1_keeps_umlauts_and_normalizes_quotes() {
        assert_eq!(Charset::Latin1.decode("Ümläüts"), "Ümläüts");
        assert_eq!(Charset::Latin1.decode("“non”-ISO"), "\"non\"-ISO");
        assert_eq!(Charset::Latin1.decode("(╯°□°）╯︵┻━┻"), "(+°#°)+(+-+");
    }

    #[test]
    fn test_ascii_transliterates() {
        assert_eq!(Charset::Ascii.decode("Ümläüts"), "Umlauts");
        assert_eq!(Charset::Ascii.decode("(╯°□°）╯︵┻━┻"), "(+deg#deg)+(+-+");
    }

    #[test]
    fn test_custom_table_takes_precedence() {
        fn table(c: char) -> Option<&'static str> {
            if c == 'ü' {
                Some("ue")
            } else {
                None
            }
        }
        assert_eq!(Charset::Ascii.decode_with("Müller", table), "Mueller");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(Charset::Utf8.escape_attr("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert_eq!(Charset::Unicode.escape_attr("Über"), "&#220;ber");
        assert_eq!(Charset::Latin1.escape_attr("Über €"), "Über &#8364;");
        assert_eq!(Charset::Utf8.escape_attr("Über €"), "Über €");
    }
}
