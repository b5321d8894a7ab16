use std::sync::LazyLock;

use regex::Regex;

static CONTENT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mxc://(.+?)/(.+)$").expect("content URI regex"));

// IPv4 literal, bracketed IPv6 literal or DNS name, then an optional port.
static SERVER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}|\[[0-9A-Fa-f:.]{2,45}\]|[A-Za-z0-9.\-]{1,255})(:\d{1,5})?$",
    )
    .expect("server name regex")
});

/// A parsed `mxc://<server>/<media id>` content locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentUri<'a> {
    pub server_name: &'a str,
    pub media_id: &'a str,
}

/// Split a content locator into server name and media id.
/// Does not validate the server name; see [`is_valid_server_name`].
pub fn parse_content_uri(uri: &str) -> Option<ContentUri<'_>> {
    let caps = CONTENT_URI.captures(uri)?;
    Some(ContentUri {
        server_name: caps.get(1)?.as_str(),
        media_id: caps.get(2)?.as_str(),
    })
}

pub fn is_valid_server_name(name: &str) -> bool {
    SERVER_NAME.is_match(name)
}
