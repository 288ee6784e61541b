/// Size limits applied while parsing untrusted input.
///
/// Every buffer a parser grows on its own is bounded by one of these, so a
/// peer cannot force unbounded memory use through protocol framing alone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Limits {
    /// Longest accepted request-line or status-line, CRLF included.
    pub max_start_line: usize,

    /// Longest accepted header or trailer field line, CRLF included.
    /// Also bounds chunk-size lines with their extensions.
    pub max_field_line: usize,

    /// Largest accepted start line plus header fields, including the
    /// empty line ending them.
    pub max_header_block: usize,

    /// Largest decoded message body kept by the message parser.
    pub max_body: u64,

    /// Largest accepted chunk size.
    pub max_chunk_size: u64,

    /// Largest accepted PROXY protocol v2 header, signature included.
    pub max_proxy_header: usize,
}

impl Limits {
    #[must_use]
    pub fn with_max_start_line(
        mut self,
        limit: usize,
    ) -> Self {
        self.max_start_line = limit;
        self
    }

    #[must_use]
    pub fn with_max_field_line(
        mut self,
        limit: usize,
    ) -> Self {
        self.max_field_line = limit;
        self
    }

    #[must_use]
    pub fn with_max_header_block(
        mut self,
        limit: usize,
    ) -> Self {
        self.max_header_block = limit;
        self
    }

    #[must_use]
    pub fn with_max_body(
        mut self,
        limit: u64,
    ) -> Self {
        self.max_body = limit;
        self
    }

    #[must_use]
    pub fn with_max_chunk_size(
        mut self,
        limit: u64,
    ) -> Self {
        self.max_chunk_size = limit;
        self
    }

    #[must_use]
    pub fn with_max_proxy_header(
        mut self,
        limit: usize,
    ) -> Self {
        self.max_proxy_header = limit;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_start_line: 8 * 1024,
            max_field_line: 8 * 1024,
            max_header_block: 64 * 1024,
            max_body: 10_000_000,
            max_chunk_size: u64::from(u32::MAX),
            max_proxy_header: 4096,
        }
    }
}
