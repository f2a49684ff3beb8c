//! POST body field extraction.
//!
//! Forms are posted with `enctype="text/plain"`, so a body is a sequence of
//! `name=value` pairs separated by CRLF (a bare CR or LF also ends a value).
//! There is no URL decoding and no `&` separator.

use std::io;

use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, error};

use crate::http::parser::recv_byte;

/// Longest attribute name accepted (a 32 byte buffer with its terminator).
pub const MAX_NAME_LEN: usize = 31;
/// Longest attribute value accepted (a 65 byte buffer with its terminator).
pub const MAX_VALUE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("attribute name longer than {MAX_NAME_LEN} bytes")]
    NameTooLong,
    #[error("value of '{0}' longer than {MAX_VALUE_LEN} bytes")]
    ValueTooLong(String),
    #[error("value of '{0}' is not valid UTF-8")]
    InvalidValue(String),
    #[error("attribute '{0}' has no value")]
    MissingValue(String),
    #[error("connection closed before the body was complete")]
    PeerClosed,
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
}

/// A form field a POST handler expects, and the value extracted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: &'static str,
    min_length: usize,
    value: String,
}

impl Attribute {
    pub const fn new(name: &'static str, min_length: usize) -> Self {
        Self {
            name,
            min_length,
            value: String::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Extracted value, empty until a body carrying this field was parsed.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn meets_min_length(&self) -> bool {
        self.value.len() >= self.min_length
    }
}

#[derive(Debug)]
enum State {
    ReadingName,
    ReadingValue(usize),
}

/// Byte-at-a-time `name=value` demultiplexer.
///
/// Values are staged and only copied into the descriptors by
/// [`commit`](Self::commit), so a body that fails part way leaves the
/// caller's attributes untouched.
#[derive(Debug)]
pub struct FormParser<'a> {
    attrs: &'a [Attribute],
    state: State,
    name: Vec<u8>,
    value: Vec<u8>,
    staged: Vec<Option<Vec<u8>>>,
}

impl<'a> FormParser<'a> {
    pub fn new(attrs: &'a [Attribute]) -> Self {
        Self {
            attrs,
            state: State::ReadingName,
            name: Vec::with_capacity(MAX_NAME_LEN),
            value: Vec::with_capacity(MAX_VALUE_LEN),
            staged: vec![None; attrs.len()],
        }
    }

    pub fn push(&mut self, c: u8) -> Result<(), FormError> {
        match self.state {
            State::ReadingName => match c {
                b'=' => {
                    let index = self
                        .attrs
                        .iter()
                        .position(|a| a.name.as_bytes() == self.name.as_slice())
                        .ok_or_else(|| {
                            let name = String::from_utf8_lossy(&self.name).into_owned();
                            error!(name = %name, "Name not found");
                            FormError::UnknownAttribute(name)
                        })?;
                    self.name.clear();
                    self.value.clear();
                    self.state = State::ReadingValue(index);
                }
                b'\r' | b'\n' => {}
                _ => {
                    if self.name.len() == MAX_NAME_LEN {
                        return Err(FormError::NameTooLong);
                    }
                    self.name.push(c);
                }
            },
            State::ReadingValue(index) => match c {
                b'\r' | b'\n' => self.stage(index),
                _ => {
                    if self.value.len() == MAX_VALUE_LEN {
                        return Err(FormError::ValueTooLong(self.attrs[index].name.to_string()));
                    }
                    self.value.push(c);
                }
            },
        }
        Ok(())
    }

    fn stage(&mut self, index: usize) {
        debug!(attribute = self.attrs[index].name, len = self.value.len(), "attribute");
        self.staged[index] = Some(std::mem::take(&mut self.value));
        self.state = State::ReadingName;
    }

    /// Ends the body. A final value without a trailing newline is accepted.
    pub fn finish(mut self) -> Result<Staged, FormError> {
        match self.state {
            State::ReadingValue(index) => self.stage(index),
            State::ReadingName if !self.name.is_empty() => {
                return Err(FormError::MissingValue(
                    String::from_utf8_lossy(&self.name).into_owned(),
                ));
            }
            State::ReadingName => {}
        }

        let mut values = Vec::with_capacity(self.staged.len());
        for (attr, staged) in self.attrs.iter().zip(self.staged) {
            let value = staged
                .map(String::from_utf8)
                .transpose()
                .map_err(|_| FormError::InvalidValue(attr.name.to_string()))?;
            values.push(value);
        }
        Ok(Staged(values))
    }
}

/// Values extracted from a complete body, ready to be committed.
#[derive(Debug)]
pub struct Staged(Vec<Option<String>>);

impl Staged {
    /// Copies the extracted values into the descriptors they were parsed for.
    /// Fields absent from the body keep their previous value.
    pub fn commit(self, attrs: &mut [Attribute]) {
        for (attr, value) in attrs.iter_mut().zip(self.0) {
            if let Some(value) = value {
                attr.value = value;
            }
        }
    }
}

/// Parses an in-memory body into `attrs`.
pub fn parse_form(body: &[u8], attrs: &mut [Attribute]) -> Result<(), FormError> {
    let mut parser = FormParser::new(attrs);
    for &c in body {
        parser.push(c)?;
    }
    let staged = parser.finish()?;
    staged.commit(attrs);
    Ok(())
}

/// Reads exactly `content_length` body bytes from the connection into `attrs`.
///
/// On error the remaining body is left unread, so the connection must be
/// closed afterwards.
pub async fn read_form<S>(
    stream: &mut S,
    content_length: usize,
    attrs: &mut [Attribute],
) -> Result<(), FormError>
where
    S: AsyncRead + Unpin + ?Sized,
{
    debug!(content_length, "reading form");
    let mut parser = FormParser::new(attrs);
    for _ in 0..content_length {
        let c = recv_byte(stream).await?.ok_or(FormError::PeerClosed)?;
        parser.push(c)?;
    }
    let staged = parser.finish()?;
    staged.commit(attrs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_body_leaves_values_untouched() {
        let mut attrs = [Attribute::new("ssid", 1), Attribute::new("password", 8)];

        let err = parse_form(b"ssid=MyNet\r\nbogus=x\r\n", &mut attrs).unwrap_err();

        assert!(matches!(err, FormError::UnknownAttribute(ref n) if n == "bogus"));
        assert_eq!(attrs[0].value(), "");
    }

    #[test]
    fn value_may_be_empty() {
        let mut attrs = [Attribute::new("ssid", 1)];

        parse_form(b"ssid=\r\n", &mut attrs).unwrap();

        assert_eq!(attrs[0].value(), "");
        assert!(!attrs[0].meets_min_length());
    }
}
