//! Raw input bytes to logical keys.
//!
//! The decoder pulls one byte at a time and never reads past the end of the
//! sequence it is decoding. Escape sequences it does not know, and reads
//! that fail in the middle of a sequence, come back as [`Key::Quit`] so a
//! truncated sequence can never block the loop.
use std::io::{self, Read};

pub const ENTER: u8 = 13;
pub const BACKSPACE: u8 = 127;
const ESC: u8 = 0x1b;

/// Control chord for a letter: `ctrl(b'q')` is the byte sent by Ctrl-Q.
pub const fn ctrl(k: u8) -> u8 {
    k & 0x1f
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Any byte without a dedicated variant, printable or control.
    Byte(u8),
    Enter,
    Backspace,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Delete,
    PageUp,
    PageDown,
    /// Bracketed paste marker; carries no input.
    Null,
    /// Unrecognized or truncated escape sequence (including a lone ESC).
    Quit,
}

/// Where the decoder gets its bytes.
pub trait ByteSource {
    /// Block until the next byte is available.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Read a byte that continues an escape sequence. Real terminals bound
    /// this with a short timeout so a lone ESC is not mistaken for a prefix.
    fn read_continuation(&mut self) -> io::Result<u8> {
        self.read_byte()
    }
}

/// Adapter for any [`Read`] implementation (tests, pipes).
pub struct ReadSource<R>(pub R);

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        match self.0.read(&mut buf)? {
            0 => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            _ => Ok(buf[0]),
        }
    }
}

pub struct KeyDecoder<S> {
    source: S,
}

impl<S: ByteSource> KeyDecoder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Block until one logical key is available.
    ///
    /// # Errors
    ///
    /// Only a failure reading the *first* byte is returned (EOF, closed
    /// terminal). Interrupted reads are retried.
    pub fn next_key(&mut self) -> io::Result<Key> {
        let byte = loop {
            match self.source.read_byte() {
                Ok(b) => break b,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        Ok(match byte {
            ESC => self.escape_sequence(),
            ENTER => Key::Enter,
            BACKSPACE => Key::Backspace,
            b => Key::Byte(b),
        })
    }

    fn next_in_sequence(&mut self) -> Option<u8> {
        match self.source.read_continuation() {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::debug!(error = %e, "Escape sequence cut short");
                None
            }
        }
    }

    fn escape_sequence(&mut self) -> Key {
        match self.next_in_sequence() {
            Some(b'[') => self.csi(),
            Some(b'O') => match self.next_in_sequence() {
                Some(b'H') => Key::Home,
                Some(b'F') => Key::End,
                _ => Key::Quit,
            },
            _ => Key::Quit,
        }
    }

    /// `ESC [` already consumed.
    fn csi(&mut self) -> Key {
        let first = match self.next_in_sequence() {
            Some(b) => b,
            None => return Key::Quit,
        };

        match first {
            b'A' => Key::ArrowUp,
            b'B' => Key::ArrowDown,
            b'C' => Key::ArrowRight,
            b'D' => Key::ArrowLeft,
            b'H' => Key::Home,
            b'F' => Key::End,
            b'0'..=b'9' => self.tilde_sequence(first),
            other => {
                tracing::debug!(byte = other, "Unknown CSI sequence");
                Key::Quit
            }
        }
    }

    /// `ESC [ <digits> ~`: editing keys and bracketed paste markers.
    fn tilde_sequence(&mut self, first_digit: u8) -> Key {
        let mut number = u32::from(first_digit - b'0');
        for _ in 0..3 {
            match self.next_in_sequence() {
                Some(b'~') => return tilde_key(number),
                Some(d @ b'0'..=b'9') => number = number * 10 + u32::from(d - b'0'),
                Some(b) if is_final(b) => return Key::Quit,
                Some(_) => break,
                None => return Key::Quit,
            }
        }
        self.skip_to_final();
        Key::Quit
    }

    /// Consume an unsupported sequence up to and including its final byte.
    fn skip_to_final(&mut self) {
        while let Some(b) = self.next_in_sequence() {
            if is_final(b) {
                break;
            }
        }
    }
}

/// CSI final bytes, `~` included.
fn is_final(b: u8) -> bool {
    (0x40..=0x7e).contains(&b)
}

fn tilde_key(number: u32) -> Key {
    match number {
        1 | 7 => Key::Home,
        3 => Key::Delete,
        4 | 8 => Key::End,
        5 => Key::PageUp,
        6 => Key::PageDown,
        200 | 201 => Key::Null,
        _ => Key::Quit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decoder(bytes: &[u8]) -> KeyDecoder<ReadSource<Cursor<Vec<u8>>>> {
        KeyDecoder::new(ReadSource(Cursor::new(bytes.to_vec())))
    }

    fn decode_all(bytes: &[u8]) -> Vec<Key> {
        let mut d = decoder(bytes);
        let mut keys = Vec::new();
        while let Ok(k) = d.next_key() {
            keys.push(k);
        }
        keys
    }

    #[test]
    fn test_plain_bytes() {
        assert_eq!(
            decode_all(b"a\r\x7fq"),
            vec![Key::Byte(b'a'), Key::Enter, Key::Backspace, Key::Byte(b'q')]
        );
    }

    #[test]
    fn test_ctrl_chord() {
        assert_eq!(ctrl(b'q'), 17);
        assert_eq!(decode_all(&[17]), vec![Key::Byte(ctrl(b'q'))]);
    }

    #[test]
    fn test_arrows_and_home_end() {
        assert_eq!(
            decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D\x1b[H\x1b[F\x1bOH\x1bOF"),
            vec![
                Key::ArrowUp,
                Key::ArrowDown,
                Key::ArrowRight,
                Key::ArrowLeft,
                Key::Home,
                Key::End,
                Key::Home,
                Key::End,
            ]
        );
    }

    #[test]
    fn test_tilde_keys() {
        assert_eq!(
            decode_all(b"\x1b[1~\x1b[3~\x1b[4~\x1b[5~\x1b[6~\x1b[7~\x1b[8~"),
            vec![
                Key::Home,
                Key::Delete,
                Key::End,
                Key::PageUp,
                Key::PageDown,
                Key::Home,
                Key::End,
            ]
        );
    }

    #[test]
    fn test_bracketed_paste_markers_are_null() {
        assert_eq!(
            decode_all(b"\x1b[200~ab\x1b[201~"),
            vec![Key::Null, Key::Byte(b'a'), Key::Byte(b'b'), Key::Null]
        );
    }

    #[test]
    fn test_unknown_sequences_quit() {
        assert_eq!(decode_all(b"\x1b[Z"), vec![Key::Quit]);
        assert_eq!(decode_all(b"\x1bx"), vec![Key::Quit]);
        assert_eq!(decode_all(b"\x1b[9~"), vec![Key::Quit]);
        assert_eq!(decode_all(b"\x1bOQ"), vec![Key::Quit]);
    }

    #[test]
    fn test_truncated_sequence_degrades_to_quit() {
        assert_eq!(decode_all(b"\x1b"), vec![Key::Quit]);
        assert_eq!(decode_all(b"\x1b["), vec![Key::Quit]);
        assert_eq!(decode_all(b"\x1b[20"), vec![Key::Quit]);
    }

    #[test]
    fn test_overlong_tilde_sequence_is_consumed() {
        assert_eq!(decode_all(b"\x1b[1234~x"), vec![Key::Quit, Key::Byte(b'x')]);
        assert_eq!(decode_all(b"\x1b[123456~x"), vec![Key::Quit, Key::Byte(b'x')]);
    }

    #[test]
    fn test_modified_key_sequence_is_consumed() {
        assert_eq!(decode_all(b"\x1b[1;5Ax"), vec![Key::Quit, Key::Byte(b'x')]);
    }

    #[test]
    fn test_does_not_read_past_sequence() {
        let mut d = decoder(b"\x1b[5~x");
        assert_eq!(d.next_key().unwrap(), Key::PageUp);
        assert_eq!(d.next_key().unwrap(), Key::Byte(b'x'));
    }

    #[test]
    fn test_eof_on_first_byte_is_error() {
        let mut d = decoder(b"");
        assert_eq!(
            d.next_key().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }

    struct Flaky {
        calls: usize,
    }

    impl ByteSource for Flaky {
        fn read_byte(&mut self) -> io::Result<u8> {
            self.calls += 1;
            if self.calls == 1 {
                Err(io::Error::from(io::ErrorKind::Interrupted))
            } else {
                Ok(b'k')
            }
        }
    }

    #[test]
    fn test_interrupted_first_read_is_retried() {
        let mut d = KeyDecoder::new(Flaky { calls: 0 });
        assert_eq!(d.next_key().unwrap(), Key::Byte(b'k'));
    }
}
