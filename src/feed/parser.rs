use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::util::decode_html_entities;

/// Errors produced while decoding an RSS document.
///
/// A parse error aborts ingestion of the whole feed for the current tick.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body is not well-formed XML
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Well-formed XML, but the root element is not `<rss>`
    #[error("Not an RSS document: root element is <{0}>")]
    NotRss(String),

    /// `<rss>` without a `<channel>`
    #[error("RSS document has no <channel>")]
    MissingChannel,
}

/// An RSS 2.0 channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

/// One `<item>` of a channel. `pub_date` is kept as the raw string from the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

/// Parse an RSS 2.0 document.
///
/// Items keep their source order. After decoding, HTML entities in the channel
/// and item titles and descriptions are resolved; links and raw date strings
/// are returned exactly as they appear in the document.
///
/// # Errors
///
/// - [`ParseError::Xml`] for malformed XML (bad syntax, mismatched or unclosed tags)
/// - [`ParseError::NotRss`] if the root element is not `<rss>`
/// - [`ParseError::MissingChannel`] if there is no `<channel>` under the root
pub fn parse_rss(bytes: &[u8]) -> Result<RssChannel, ParseError> {
    let mut channel = decode_document(bytes)?;

    channel.title = decode_html_entities(&channel.title).into_owned();
    channel.description = decode_html_entities(&channel.description).into_owned();
    for item in &mut channel.items {
        item.title = decode_html_entities(&item.title).into_owned();
        item.description = decode_html_entities(&item.description).into_owned();
    }

    Ok(channel)
}

/// Walk the XML event stream and collect the fields we care about.
///
/// Each open element carries its own text buffer, so character data belongs to
/// the element that directly contains it; text of nested unknown elements is
/// not merged into the parent.
fn decode_document(bytes: &[u8]) -> Result<RssChannel, ParseError> {
    // SEC-002: quick-xml 0.37 never expands <!ENTITY> declarations from a DOCTYPE.
    // Only the predefined XML entities and the static HTML5 table are resolved.
    let mut reader = Reader::from_reader(bytes);

    let mut buf = Vec::new();
    // (element name, accumulated text)
    let mut stack: Vec<(String, String)> = Vec::new();
    let mut channel: Option<RssChannel> = None;
    let mut item: Option<RssItem> = None;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if !seen_root {
                    seen_root = true;
                    if name != "rss" {
                        return Err(ParseError::NotRss(name));
                    }
                }
                match (path_of(&stack).as_slice(), name.as_str()) {
                    (["rss"], "channel") if channel.is_none() => {
                        channel = Some(RssChannel::default());
                    }
                    (["rss", "channel"], "item") => item = Some(RssItem::default()),
                    _ => {}
                }
                stack.push((name, String::new()));
            }
            Ok(Event::Empty(e)) => {
                if !seen_root {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(if name == "rss" {
                        ParseError::MissingChannel
                    } else {
                        ParseError::NotRss(name)
                    });
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, text)) = stack.last_mut() {
                    let unescaped = e
                        .unescape_with(resolve_entity)
                        .map_err(|err| ParseError::Xml(err.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, text)) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, text)) = stack.pop() else {
                    return Err(ParseError::Xml("unexpected closing tag".to_string()));
                };
                let text = text.trim();
                match (path_of(&stack).as_slice(), name.as_str()) {
                    (["rss", "channel"], "item") => {
                        if let (Some(channel), Some(done)) = (channel.as_mut(), item.take()) {
                            channel.items.push(done);
                        }
                    }
                    (["rss", "channel", "item"], field) => {
                        if let Some(item) = item.as_mut() {
                            match field {
                                "title" => item.title = text.to_string(),
                                "link" => item.link = text.to_string(),
                                "description" => item.description = text.to_string(),
                                "pubDate" => item.pub_date = text.to_string(),
                                _ => {}
                            }
                        }
                    }
                    (["rss", "channel"], field) => {
                        if let Some(channel) = channel.as_mut() {
                            match field {
                                "title" => channel.title = text.to_string(),
                                "link" => channel.link = text.to_string(),
                                "description" => channel.description = text.to_string(),
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some((name, _)) = stack.last() {
        return Err(ParseError::Xml(format!("unclosed element <{}>", name)));
    }
    if !seen_root {
        return Err(ParseError::Xml("document has no root element".to_string()));
    }
    channel.ok_or(ParseError::MissingChannel)
}

fn path_of(stack: &[(String, String)]) -> Vec<&str> {
    stack.iter().map(|(name, _)| name.as_str()).collect()
}

/// XML-level entity resolution: the five predefined entities, then named HTML5
/// entities (feeds routinely use `&nbsp;` and friends without declaring them).
fn resolve_entity(entity: &str) -> Option<&'static str> {
    resolve_predefined_entity(entity).or_else(|| resolve_html5_entity(entity))
}
