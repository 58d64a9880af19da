//! Streams and the stream registry.
//!
//! Stream handles surface to Prolog as `'$stream'(N)` terms; aliases
//! are atoms resolved through the registry.  Text streams read and
//! write UTF-8 a character at a time with a pushback buffer (peeking,
//! and re-injecting the reader's lookahead), binary streams work on
//! bytes.  End-of-stream behavior follows the stream's `eof_action`
//! option.

use crate::{domain_error, existence_error, instantiation_error, Exception};
use horn_terms::{func, Atom, Env, Term};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

/// Direction a stream was opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Read,
    Write,
    Append,
}

impl StreamMode {
    pub fn atom(self) -> Term {
        Term::atom(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Append => "append",
        })
    }
}

/// Text or binary transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Text,
    Binary,
}

impl StreamType {
    pub fn atom(self) -> Term {
        Term::atom(match self {
            Self::Text => "text",
            Self::Binary => "binary",
        })
    }
}

/// What a read past end of stream does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofAction {
    Error,
    EofCode,
    Reset,
}

impl EofAction {
    pub fn atom(self) -> Term {
        Term::atom(match self {
            Self::Error => "error",
            Self::EofCode => "eof_code",
            Self::Reset => "reset",
        })
    }
}

trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

enum StreamEnd {
    In(Box<dyn Read>),
    InSeek(Box<dyn ReadSeek>),
    Out(Box<dyn Write>),
    OutSeek(Box<dyn WriteSeek>),
}

/// A byte sink observable from outside the registry; used for the
/// buffered standard streams of tests and embeddings.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Outcome of a unit read.
pub enum Got<T> {
    Item(T),
    /// End of stream reached (first time, or `eof_code`/`reset`).
    Eof,
    /// Already past end of stream with `eof_action(error)`.
    PastEof,
}

/// One open stream.
pub struct Stream {
    pub alias: Option<Atom>,
    pub mode: StreamMode,
    pub typ: StreamType,
    pub reposition: bool,
    pub eof_action: EofAction,
    pub file_name: Option<String>,
    end: StreamEnd,
    pushback: Vec<char>,
    byte_pushback: Vec<u8>,
    pos: u64,
    past_eof: bool,
}

impl Stream {
    fn new(end: StreamEnd, mode: StreamMode) -> Self {
        Self {
            alias: None,
            mode,
            typ: StreamType::Text,
            reposition: false,
            eof_action: EofAction::EofCode,
            file_name: None,
            end,
            pushback: Vec::new(),
            byte_pushback: Vec::new(),
            pos: 0,
            past_eof: false,
        }
    }

    /// An input stream over any reader; not repositionable.
    pub fn input(r: impl Read + 'static) -> Self {
        Self::new(StreamEnd::In(Box::new(r)), StreamMode::Read)
    }

    /// A repositionable input stream.
    pub fn input_seekable(r: impl Read + Seek + 'static) -> Self {
        let mut s = Self::new(StreamEnd::InSeek(Box::new(r)), StreamMode::Read);
        s.reposition = true;
        s
    }

    /// An input stream over in-memory text.
    pub fn input_text(text: impl Into<Vec<u8>>) -> Self {
        Self::input_seekable(Cursor::new(text.into()))
    }

    /// An output stream over any writer; not repositionable.
    pub fn output(w: impl Write + 'static, mode: StreamMode) -> Self {
        Self::new(StreamEnd::Out(Box::new(w)), mode)
    }

    /// A repositionable output stream.
    pub fn output_seekable(w: impl Write + Seek + 'static, mode: StreamMode) -> Self {
        let mut s = Self::new(StreamEnd::OutSeek(Box::new(w)), mode);
        s.reposition = true;
        s
    }

    pub fn is_input(&self) -> bool {
        matches!(self.end, StreamEnd::In(_) | StreamEnd::InSeek(_))
    }

    pub fn is_output(&self) -> bool {
        !self.is_input()
    }

    fn reader(&mut self) -> Option<&mut dyn Read> {
        match &mut self.end {
            StreamEnd::In(r) => Some(r.as_mut()),
            StreamEnd::InSeek(r) => Some(r),
            _ => None,
        }
    }

    fn writer(&mut self) -> Option<&mut dyn Write> {
        match &mut self.end {
            StreamEnd::Out(w) => Some(w.as_mut()),
            StreamEnd::OutSeek(w) => Some(w),
            _ => None,
        }
    }

    fn read_raw_byte(&mut self) -> io::Result<Option<u8>> {
        let Some(r) = self.reader() else {
            return Ok(None);
        };
        let mut buf = [0u8; 1];
        loop {
            match r.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Read one character (UTF-8).  `None` at end of stream.
    fn read_char_raw(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.pushback.pop() {
            self.pos += c.len_utf8() as u64;
            return Ok(Some(c));
        }
        let Some(first) = self.read_raw_byte()? else {
            return Ok(None);
        };
        let width = utf8_width(first);
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            match self.read_raw_byte()? {
                Some(b) => *slot = b,
                None => break,
            }
        }
        self.pos += width as u64;
        let c = std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        Ok(Some(c))
    }

    /// Push a character back; the next read returns it again.
    pub fn unread_char(&mut self, c: char) {
        self.pos = self.pos.saturating_sub(c.len_utf8() as u64);
        self.past_eof = false;
        self.pushback.push(c);
    }

    /// Read one character honoring the eof action.
    pub fn get_char(&mut self) -> io::Result<Got<char>> {
        match self.read_char_raw()? {
            Some(c) => Ok(Got::Item(c)),
            None => Ok(self.note_eof()),
        }
    }

    /// Read one byte honoring the eof action.
    pub fn get_byte(&mut self) -> io::Result<Got<u8>> {
        if let Some(b) = self.byte_pushback.pop() {
            self.pos += 1;
            return Ok(Got::Item(b));
        }
        match self.read_raw_byte()? {
            Some(b) => {
                self.pos += 1;
                Ok(Got::Item(b))
            }
            None => Ok(self.note_eof()),
        }
    }

    /// Push a byte back; the next read returns it again.
    pub fn unread_byte(&mut self, b: u8) {
        self.pos = self.pos.saturating_sub(1);
        self.past_eof = false;
        self.byte_pushback.push(b);
    }

    fn note_eof<T>(&mut self) -> Got<T> {
        if !self.past_eof {
            self.past_eof = true;
            return Got::Eof;
        }
        match self.eof_action {
            EofAction::Error => Got::PastEof,
            EofAction::EofCode => Got::Eof,
            EofAction::Reset => {
                self.past_eof = false;
                Got::Eof
            }
        }
    }

    /// `true` once a read has returned end of stream.
    pub fn past_eof(&self) -> bool {
        self.past_eof
    }

    /// Current position in bytes from the start of the stream.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        let n = s.len() as u64;
        let w = self
            .writer()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "not an output stream"))?;
        w.write_all(s.as_bytes())?;
        self.pos += n;
        Ok(())
    }

    pub fn write_byte(&mut self, b: u8) -> io::Result<()> {
        let w = self
            .writer()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "not an output stream"))?;
        w.write_all(&[b])?;
        self.pos += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.writer() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }

    /// Seek to an absolute byte position; requires `reposition(true)`.
    pub fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        match &mut self.end {
            StreamEnd::InSeek(r) => r.seek(SeekFrom::Start(pos))?,
            StreamEnd::OutSeek(w) => w.seek(SeekFrom::Start(pos))?,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "stream is not repositionable",
                ))
            }
        };
        self.pushback.clear();
        self.byte_pushback.clear();
        self.past_eof = false;
        self.pos = pos;
        Ok(())
    }
}

fn utf8_width(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

/// The stream registry plus the current input/output slots.
pub struct StreamTab {
    streams: IndexMap<u64, Stream>,
    next_id: u64,
    current_input: u64,
    current_output: u64,
}

impl StreamTab {
    /// A registry with the two standard streams attached to the given
    /// ends, aliased `user_input` and `user_output`.
    pub fn with_stdio(stdin: Stream, stdout: Stream) -> Self {
        let mut tab = Self {
            streams: IndexMap::new(),
            next_id: 0,
            current_input: 0,
            current_output: 0,
        };
        let mut stdin = stdin;
        stdin.alias = Some(Atom::new("user_input"));
        let mut stdout = stdout;
        stdout.alias = Some(Atom::new("user_output"));
        tab.current_input = tab.add(stdin);
        tab.current_output = tab.add(stdout);
        tab
    }

    pub fn add(&mut self, stream: Stream) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.streams.insert(id, stream);
        id
    }

    pub fn get(&self, id: u64) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    /// Temporarily take a stream out of the registry (the reader needs
    /// exclusive access while the machine stays borrowed).
    pub fn take(&mut self, id: u64) -> Option<Stream> {
        self.streams.shift_remove(&id)
    }

    /// Put a taken stream back under its id.
    pub fn put_back(&mut self, id: u64, stream: Stream) {
        self.streams.insert(id, stream);
        // taking and re-inserting moves the entry to the tail; restore
        // definition order for deterministic enumeration
        self.streams.sort_keys();
    }

    pub fn current_input(&self) -> u64 {
        self.current_input
    }

    pub fn current_output(&self) -> u64 {
        self.current_output
    }

    pub fn set_current_input(&mut self, id: u64) {
        self.current_input = id;
    }

    pub fn set_current_output(&mut self, id: u64) {
        self.current_output = id;
    }

    /// All open streams in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Stream)> {
        self.streams.iter().map(|(id, s)| (*id, s))
    }

    /// The `'$stream'(N)` handle for `id`.
    pub fn term_for(id: u64) -> Term {
        func!["$stream"; Term::int(id as i64)]
    }

    /// Resolve a stream-or-alias term to a stream id.
    pub fn resolve(&self, env: &Env, t: &Term) -> Result<u64, Exception> {
        let t = env.resolve(t).clone();
        match &t {
            Term::Var(_) => Err(instantiation_error(t)),
            Term::Atom(alias) => {
                match self
                    .streams
                    .iter()
                    .find(|(_, s)| s.alias.as_ref() == Some(alias))
                {
                    Some((id, _)) => Ok(*id),
                    None => Err(existence_error("stream", t.clone())),
                }
            }
            Term::Compound(_) => {
                if let Some(args) = t.as_struct("$stream", 1) {
                    if let Term::Int(id) = env.resolve(&args[0]) {
                        let id = *id as u64;
                        if self.streams.contains_key(&id) {
                            return Ok(id);
                        }
                        return Err(existence_error("stream", env.resolved(&t)));
                    }
                }
                Err(domain_error("stream_or_alias", env.resolved(&t)))
            }
            _ => Err(domain_error("stream_or_alias", env.resolved(&t))),
        }
    }

    /// Close a stream.  Closing a current stream resets the slot to
    /// the corresponding standard stream.
    pub fn close(&mut self, id: u64) -> io::Result<()> {
        if let Some(mut s) = self.streams.shift_remove(&id) {
            s.flush()?;
        }
        if self.current_input == id {
            self.current_input = 0;
        }
        if self.current_output == id {
            self.current_output = 1;
        }
        Ok(())
    }

    /// Open a file stream.
    pub fn open_file(
        &mut self,
        name: &str,
        mode: StreamMode,
    ) -> io::Result<u64> {
        let stream = match mode {
            StreamMode::Read => {
                let mut s = Stream::input_seekable(File::open(name)?);
                s.file_name = Some(name.to_string());
                s
            }
            StreamMode::Write => {
                let f = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(name)?;
                let mut s = Stream::output_seekable(f, StreamMode::Write);
                s.file_name = Some(name.to_string());
                s
            }
            StreamMode::Append => {
                let f = OpenOptions::new().append(true).create(true).open(name)?;
                let mut s = Stream::output(f, StreamMode::Append);
                s.file_name = Some(name.to_string());
                s
            }
        };
        Ok(self.add(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_read_with_pushback() {
        let mut s = Stream::input_text("héllo");
        assert!(matches!(s.get_char().unwrap(), Got::Item('h')));
        assert!(matches!(s.get_char().unwrap(), Got::Item('é')));
        s.unread_char('é');
        assert!(matches!(s.get_char().unwrap(), Got::Item('é')));
        assert!(matches!(s.get_char().unwrap(), Got::Item('l')));
    }

    #[test]
    fn eof_then_eof_action() {
        let mut s = Stream::input_text("");
        assert!(matches!(s.get_char().unwrap(), Got::Eof));
        // default eof_code keeps yielding eof
        assert!(matches!(s.get_char().unwrap(), Got::Eof));
        s.eof_action = EofAction::Error;
        assert!(matches!(s.get_char().unwrap(), Got::PastEof));
    }

    #[test]
    fn shared_buffer_output() {
        let buf = SharedBuf::default();
        let mut s = Stream::output(buf.clone(), StreamMode::Write);
        s.write_str("hello").unwrap();
        assert_eq!(&*buf.0.borrow(), b"hello");
        assert_eq!(s.position(), 5);
    }

    #[test]
    fn seek_resets_state() {
        let mut s = Stream::input_text("abc");
        while let Got::Item(_) = s.get_char().unwrap() {}
        assert!(s.past_eof());
        s.seek_to(1).unwrap();
        assert!(!s.past_eof());
        assert!(matches!(s.get_char().unwrap(), Got::Item('b')));
    }

    #[test]
    fn registry_resolution() {
        let env = Env::new();
        let tab = StreamTab::with_stdio(
            Stream::input_text(""),
            Stream::output(SharedBuf::default(), StreamMode::Write),
        );
        assert_eq!(tab.resolve(&env, &Term::atom("user_input")).unwrap(), 0);
        assert_eq!(tab.resolve(&env, &StreamTab::term_for(1)).unwrap(), 1);
        assert!(tab.resolve(&env, &Term::atom("nowhere")).is_err());
        assert!(tab.resolve(&env, &Term::int(3)).is_err());
        let v = horn_terms::Var::fresh();
        assert!(tab.resolve(&env, &Term::var(v)).is_err());
    }

    #[test]
    fn binary_bytes() {
        let mut s = Stream::input_text(vec![1u8, 2, 3]);
        s.typ = StreamType::Binary;
        assert!(matches!(s.get_byte().unwrap(), Got::Item(1)));
        s.unread_byte(1);
        assert!(matches!(s.get_byte().unwrap(), Got::Item(1)));
        assert!(matches!(s.get_byte().unwrap(), Got::Item(2)));
    }
}
