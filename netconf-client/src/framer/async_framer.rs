use crate::error::{NetconfClientError, NetconfClientResult};
use crate::framer::{Framer, NETCONF_1_0_TERMINATOR, NETCONF_1_1_END_OF_CHUNKS};
use async_trait::async_trait;
use log::trace;
use memmem::{Searcher, TwoWaySearcher};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest chunk-size allowed by RFC 6242.
const MAX_CHUNK_SIZE: usize = u32::MAX as usize;

/// NETCONF message framing over any async byte channel.
/// See [RFC6242](https://tools.ietf.org/html/rfc6242#section-4.1)
pub struct AsyncFramer<T> {
    read_buffer: Vec<u8>,
    chunked: bool,

    channel: T,
}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncFramer<T> {
    pub fn new(channel: T) -> Self {
        AsyncFramer {
            read_buffer: Vec::new(),
            chunked: false,
            channel,
        }
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.channel
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Parses `\n#<size>\n`; returns 0 for the `\n##\n` end-of-chunks marker.
    /// Sizes run from 1 to 4294967295 without leading zeros.
    async fn read_chunk_header(&mut self) -> NetconfClientResult<usize> {
        let mut lead = [0u8; 3];
        self.channel.read_exact(&mut lead).await?;
        expect_byte(b'\n', lead[0])?;
        expect_byte(b'#', lead[1])?;

        let mut size = match lead[2] {
            b'#' => {
                expect_byte(b'\n', self.channel.read_u8().await?)?;
                return Ok(0);
            }
            digit @ b'1'..=b'9' => usize::from(digit - b'0'),
            other => {
                return Err(NetconfClientError::MalformedChunk {
                    expected: '1',
                    actual: other.into(),
                })
            }
        };
        loop {
            let byte = self.channel.read_u8().await?;
            match byte {
                b'\n' => return Ok(size),
                b'0'..=b'9' => {
                    size = size
                        .checked_mul(10)
                        .and_then(|size| size.checked_add(usize::from(byte - b'0')))
                        .filter(|size| *size <= MAX_CHUNK_SIZE)
                        .ok_or(NetconfClientError::MalformedChunk {
                            expected: '\n',
                            actual: byte.into(),
                        })?;
                }
                other => {
                    return Err(NetconfClientError::MalformedChunk {
                        expected: '\n',
                        actual: other.into(),
                    })
                }
            }
        }
    }

    async fn read_chunked(&mut self) -> NetconfClientResult<String> {
        loop {
            let size = self.read_chunk_header().await?;
            if size == 0 {
                break;
            }
            let start = self.read_buffer.len();
            self.read_buffer.resize(start + size, 0);
            self.channel.read_exact(&mut self.read_buffer[start..]).await?;
        }
        let message = String::from_utf8_lossy(&self.read_buffer)
            .trim_end()
            .to_string();
        self.read_buffer.clear();
        Ok(message)
    }

    async fn read_until_terminator(&mut self) -> NetconfClientResult<String> {
        let search = TwoWaySearcher::new(NETCONF_1_0_TERMINATOR.as_bytes());
        let mut buffer = [0u8; 1024];
        let pos = loop {
            if let Some(pos) = search.search_in(&self.read_buffer) {
                break pos;
            }
            let bytes = self.channel.read(&mut buffer).await?;
            if bytes == 0 {
                return Err(NetconfClientError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "channel closed before end-of-message marker",
                )));
            }
            self.read_buffer.extend_from_slice(&buffer[..bytes]);
        };
        let message = String::from_utf8_lossy(&self.read_buffer[..pos])
            .trim()
            .to_string();
        self.read_buffer
            .drain(..pos + NETCONF_1_0_TERMINATOR.len());
        Ok(message)
    }
}

fn expect_byte(expected: u8, actual: u8) -> NetconfClientResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(NetconfClientError::MalformedChunk {
            expected: expected.into(),
            actual: actual.into(),
        })
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Framer for AsyncFramer<T> {
    async fn upgrade(&mut self) {
        self.chunked = true;
    }

    async fn read_async(&mut self) -> NetconfClientResult<String> {
        let message = if self.chunked {
            self.read_chunked().await?
        } else {
            self.read_until_terminator().await?
        };
        trace!("Received:\n{}", message);
        Ok(message)
    }

    async fn write_async(&mut self, rpc: &str) -> NetconfClientResult<()> {
        trace!("Sending:\n{}", rpc);
        let bytes = rpc.as_bytes();
        if self.chunked {
            self.channel
                .write_all(format!("\n#{}\n", bytes.len()).as_bytes())
                .await?;
            self.channel.write_all(bytes).await?;
            self.channel
                .write_all(NETCONF_1_1_END_OF_CHUNKS.as_bytes())
                .await?;
        } else {
            self.channel.write_all(bytes).await?;
            self.channel
                .write_all(NETCONF_1_0_TERMINATOR.as_bytes())
                .await?;
        }
        self.channel.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const OK_REPLY: &str = r#"<rpc-reply message-id="101" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><ok/></rpc-reply>"#;

    #[tokio::test]
    async fn reads_message_split_over_chunks() {
        let mut wire = String::new();
        for part in [&OK_REPLY[..40], &OK_REPLY[40..]] {
            wire.push_str(&format!("\n#{}\n{}", part.len(), part));
        }
        wire.push_str("\n##\n");

        let mut framer = AsyncFramer::new(Cursor::new(wire.into_bytes()));
        framer.upgrade().await;

        assert_eq!(framer.read_async().await.unwrap(), OK_REPLY);
    }

    #[tokio::test]
    async fn reads_consecutive_end_of_message_frames() {
        let wire = format!("{OK_REPLY}]]>]]>\n<hello/>]]>]]>");
        let mut framer = AsyncFramer::new(Cursor::new(wire.into_bytes()));

        assert_eq!(framer.read_async().await.unwrap(), OK_REPLY);
        assert_eq!(framer.read_async().await.unwrap(), "<hello/>");
    }

    async fn chunk_header_error(wire: &[u8]) -> (char, char) {
        let mut framer = AsyncFramer::new(Cursor::new(wire.to_vec()));
        framer.upgrade().await;
        match framer.read_async().await {
            Err(NetconfClientError::MalformedChunk { expected, actual }) => (expected, actual),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejects_malformed_chunk_header() {
        assert_eq!(chunk_header_error(b"\n#12x\n").await, ('\n', 'x'));
        assert_eq!(chunk_header_error(b"\n#12#\n").await, ('\n', '#'));
        assert_eq!(chunk_header_error(b"\n##5\n").await, ('\n', '5'));
    }

    #[tokio::test]
    async fn rejects_zero_and_oversized_chunks() {
        assert_eq!(chunk_header_error(b"\n#0\nabc").await, ('1', '0'));
        assert_eq!(chunk_header_error(b"\n#007\nabc").await, ('1', '0'));
        assert_eq!(
            chunk_header_error(b"\n#99999999999999999999999\nabc").await.0,
            '\n'
        );
        assert_eq!(chunk_header_error(b"\n#4294967296\nabc").await, ('\n', '6'));
    }

    #[tokio::test]
    async fn accepts_largest_chunk_size_header() {
        let mut framer = AsyncFramer::new(Cursor::new(b"\n#4294967295\n".to_vec()));
        assert_eq!(framer.read_chunk_header().await.unwrap(), 4_294_967_295);
    }

    #[tokio::test]
    async fn eof_before_terminator_is_an_error() {
        let mut framer = AsyncFramer::new(Cursor::new(b"<rpc-reply>".to_vec()));
        assert!(matches!(
            framer.read_async().await,
            Err(NetconfClientError::Io(_))
        ));
    }

    #[tokio::test]
    async fn writes_both_framings() {
        let mut framer = AsyncFramer::new(Cursor::new(Vec::new()));
        framer.write_async("<commit/>").await.unwrap();
        framer.upgrade().await;
        framer.write_async("<commit/>").await.unwrap();

        let written = String::from_utf8(framer.get_mut().get_ref().clone()).unwrap();
        assert_eq!(written, "<commit/>]]>]]>\n#9\n<commit/>\n##\n");
    }
}
