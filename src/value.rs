//! Typed values moving between the filesystem layer and property handlers.
//!
//! A [`Query`] is created for one property with that property's [`Format`].
//! Handlers may only use the accessor matching the format, anything else is
//! a bug in the handler and panics.
use crate::{error::PropertyError, property::Format};
use std::fmt;

pub type Result<T, E = PropertyError> = std::result::Result<T, E>;

/// A single typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    YesNo(bool),
    Unsigned(u64),
    Float(f64),
    Ascii(Vec<u8>),
}

impl Value {
    /// Parse filesystem text as a value of `format`.
    ///
    /// Surrounding whitespace is ignored except for [`Format::Ascii`], which
    /// is taken verbatim.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::InvalidArgument`] if `text` isn't a valid `format`
    pub fn parse(format: Format, text: &str) -> Result<Self> {
        let trimmed = text.trim();
        match format {
            Format::YesNo => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "y" | "yes" | "on" | "true" => Ok(Self::YesNo(true)),
                "0" | "n" | "no" | "off" | "false" => Ok(Self::YesNo(false)),
                _ => Err(PropertyError::InvalidArgument),
            },
            Format::Unsigned => trimmed
                .parse()
                .map(Self::Unsigned)
                .map_err(|_| PropertyError::InvalidArgument),
            Format::Float => trimmed
                .parse()
                .map(Self::Float)
                .map_err(|_| PropertyError::InvalidArgument),
            Format::Ascii => Ok(Self::Ascii(text.as_bytes().to_vec())),
        }
    }

    fn format(&self) -> Format {
        match self {
            Self::YesNo(_) => Format::YesNo,
            Self::Unsigned(_) => Format::Unsigned,
            Self::Float(_) => Format::Float,
            Self::Ascii(_) => Format::Ascii,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YesNo(b) => write!(f, "{}", u8::from(*b)),
            Self::Unsigned(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Ascii(s) => write!(f, "{}", String::from_utf8_lossy(s)),
        }
    }
}

/// Value carrier for one property read or write.
#[derive(Debug, Clone)]
pub struct Query {
    format: Format,
    offset: usize,
    size: usize,
    value: Option<Value>,
}

impl Query {
    /// Empty query for a read of the whole value.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            offset: 0,
            size: usize::MAX,
            value: None,
        }
    }

    /// Empty query for a partial read of text, `size` bytes from `offset`.
    pub fn with_range(format: Format, offset: usize, size: usize) -> Self {
        Self {
            format,
            offset,
            size,
            value: None,
        }
    }

    /// Query carrying `value`, for a write.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::InvalidArgument`] if `value` isn't a `format` value
    pub fn from_value(format: Format, value: Value) -> Result<Self> {
        if value.format() != format {
            return Err(PropertyError::InvalidArgument);
        }
        Ok(Self {
            value: Some(value),
            ..Self::new(format)
        })
    }

    /// Query carrying `text` parsed as `format`, for a write.
    pub fn parse(format: Format, text: &str) -> Result<Self> {
        Self::from_value(format, Value::parse(format, text)?)
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The value, if one has been set.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    fn check(&self, format: Format) {
        assert_eq!(
            self.format, format,
            "{format:?} accessor used on a {:?} query",
            self.format
        );
    }

    pub fn set_yesno(&mut self, b: bool) {
        self.check(Format::YesNo);
        self.value = Some(Value::YesNo(b));
    }

    pub fn set_unsigned(&mut self, u: u64) {
        self.check(Format::Unsigned);
        self.value = Some(Value::Unsigned(u));
    }

    pub fn set_float(&mut self, x: f64) {
        self.check(Format::Float);
        self.value = Some(Value::Float(x));
    }

    /// Store the `offset`/`size` window of `text`.
    ///
    /// An offset past the end stores nothing.
    pub fn set_ascii(&mut self, text: &[u8]) {
        self.check(Format::Ascii);
        let start = self.offset.min(text.len());
        let end = start.saturating_add(self.size).min(text.len());
        self.value = Some(Value::Ascii(text[start..end].to_vec()));
    }

    /// # Panics
    ///
    /// If the query isn't [`Format::YesNo`] or holds no value
    pub fn yesno(&self) -> bool {
        self.check(Format::YesNo);
        match self.value {
            Some(Value::YesNo(b)) => b,
            _ => panic!("yesno query has no value"),
        }
    }

    /// # Panics
    ///
    /// If the query isn't [`Format::Unsigned`] or holds no value
    pub fn unsigned(&self) -> u64 {
        self.check(Format::Unsigned);
        match self.value {
            Some(Value::Unsigned(u)) => u,
            _ => panic!("unsigned query has no value"),
        }
    }

    /// # Panics
    ///
    /// If the query isn't [`Format::Float`] or holds no value
    pub fn float(&self) -> f64 {
        self.check(Format::Float);
        match self.value {
            Some(Value::Float(x)) => x,
            _ => panic!("float query has no value"),
        }
    }

    /// # Panics
    ///
    /// If the query isn't [`Format::Ascii`] or holds no value
    pub fn ascii(&self) -> &[u8] {
        self.check(Format::Ascii);
        match &self.value {
            Some(Value::Ascii(s)) => s,
            _ => panic!("ascii query has no value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ascii() {
        let mut q = Query::with_range(Format::Ascii, 2, 3);
        q.set_ascii(b"DS9490R");
        assert_eq!(q.ascii(), b"949");

        let mut q = Query::with_range(Format::Ascii, 5, 100);
        q.set_ascii(b"DS9490R");
        assert_eq!(q.ascii(), b"0R");

        let mut q = Query::with_range(Format::Ascii, 50, 10);
        q.set_ascii(b"DS9490R");
        assert_eq!(q.ascii(), b"");

        let mut q = Query::new(Format::Ascii);
        q.set_ascii(b"DS9490R");
        assert_eq!(q.ascii(), b"DS9490R");
    }

    #[test]
    #[should_panic]
    fn wrong_accessor() {
        let mut q = Query::new(Format::Unsigned);
        q.set_yesno(true);
    }

    #[test]
    fn parse() {
        assert_eq!(Value::parse(Format::YesNo, "Yes\n"), Ok(Value::YesNo(true)));
        assert_eq!(Value::parse(Format::YesNo, "0"), Ok(Value::YesNo(false)));
        assert_eq!(
            Value::parse(Format::YesNo, "maybe"),
            Err(PropertyError::InvalidArgument)
        );
        assert_eq!(Value::parse(Format::Unsigned, " 12 "), Ok(Value::Unsigned(12)));
        assert_eq!(
            Value::parse(Format::Unsigned, "-1"),
            Err(PropertyError::InvalidArgument)
        );
        assert_eq!(Value::parse(Format::Float, "1.5"), Ok(Value::Float(1.5)));
        assert_eq!(
            Value::parse(Format::Ascii, " x "),
            Ok(Value::Ascii(b" x ".to_vec()))
        );
    }

    #[test]
    fn from_value_checks_format() {
        assert!(Query::from_value(Format::YesNo, Value::Unsigned(1)).is_err());
        let q = Query::parse(Format::Unsigned, "7").unwrap();
        assert_eq!(q.unsigned(), 7);
    }

    #[test]
    fn display() {
        assert_eq!(Value::YesNo(true).to_string(), "1");
        assert_eq!(Value::Unsigned(42).to_string(), "42");
        assert_eq!(Value::Ascii(b"USB".to_vec()).to_string(), "USB");
    }
}
