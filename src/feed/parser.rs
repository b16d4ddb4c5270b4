use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Elements nested deeper than this abort the parse.
const MAX_DEPTH: usize = 64;

/// Document-level failure to decode a feed. Aborts the whole feed; there is no
/// partial recovery of malformed XML.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Feed body is empty")]
    Empty,
    #[error("Malformed RSS document: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Malformed RSS document: input ended inside <{0}>")]
    Truncated(String),
    #[error("Malformed RSS document: no <channel> element")]
    MissingChannel,
    #[error("Malformed RSS document: nesting deeper than {0} levels")]
    TooDeep(usize),
}

/// An RSS 2.0 document as fetched: the `<channel>` and its items in
/// document order. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RssDocument {
    pub channel: RssChannel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub items: Vec<RssItem>,
}

/// One raw `<item>`. `pub_date` is kept verbatim; normalization parses it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    ChannelTitle,
    ChannelLink,
    ChannelDescription,
    ChannelLanguage,
    ItemTitle,
    ItemLink,
    ItemPubDate,
    ItemDescription,
}

impl Field {
    fn of_channel(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::ChannelTitle),
            b"link" => Some(Self::ChannelLink),
            b"description" => Some(Self::ChannelDescription),
            b"language" => Some(Self::ChannelLanguage),
            _ => None,
        }
    }

    fn of_item(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::ItemTitle),
            b"link" => Some(Self::ItemLink),
            b"pubDate" => Some(Self::ItemPubDate),
            b"description" => Some(Self::ItemDescription),
            _ => None,
        }
    }
}

/// Tracks the open element path and fills in the channel as events arrive.
///
/// Names are compared in their qualified form, so only unprefixed elements
/// match. `<atom:link>`, `<itunes:title>`, `<dc:creator>` and the like fall
/// through as unknown elements instead of shadowing the RSS fields.
#[derive(Default)]
struct DocumentBuilder {
    path: Vec<Vec<u8>>,
    channel: Option<RssChannel>,
    channel_open: bool,
    item: Option<RssItem>,
    /// Field being captured and the path length at which its text lives.
    field: Option<(Field, usize)>,
    text: String,
}

impl DocumentBuilder {
    fn in_channel(&self) -> bool {
        self.channel_open && self.path.len() == 2
    }

    fn in_item(&self) -> bool {
        self.item.is_some() && self.path.len() == 3
    }

    fn start(&mut self, name: &[u8]) -> Result<(), ParseError> {
        if self.path.len() >= MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        if self.path.len() == 1 && name == b"channel" && self.channel.is_none() {
            self.channel = Some(RssChannel::default());
            self.channel_open = true;
        } else if self.in_channel() && name == b"item" {
            self.item = Some(RssItem::default());
        } else if self.field.is_none() {
            let field = if self.in_item() {
                Field::of_item(name)
            } else if self.in_channel() {
                Field::of_channel(name)
            } else {
                None
            };
            if let Some(field) = field {
                self.field = Some((field, self.path.len() + 1));
                self.text.clear();
            }
        }
        self.path.push(name.to_vec());
        Ok(())
    }

    /// `<item/>` still counts as an item; other empty elements carry no text.
    fn empty(&mut self, name: &[u8]) {
        if self.path.len() == 1 && name == b"channel" && self.channel.is_none() {
            self.channel = Some(RssChannel::default());
        } else if self.in_channel() && name == b"item" {
            if let Some(channel) = self.channel.as_mut() {
                channel.items.push(RssItem::default());
            }
        }
    }

    fn text(&mut self, text: &str) {
        if matches!(self.field, Some((_, depth)) if depth == self.path.len()) {
            self.text.push_str(text);
        }
    }

    fn end(&mut self) {
        let depth = self.path.len();
        let name = self.path.pop();

        if let Some((field, field_depth)) = self.field {
            if field_depth == depth {
                self.assign(field);
                self.field = None;
            }
            return;
        }

        match (depth, name.as_deref()) {
            (3, Some(b"item")) if self.channel_open => {
                if let (Some(item), Some(channel)) = (self.item.take(), self.channel.as_mut()) {
                    channel.items.push(item);
                }
            }
            (2, Some(b"channel")) if self.channel_open => self.channel_open = false,
            _ => {}
        }
    }

    /// First occurrence wins when a field repeats.
    fn assign(&mut self, field: Field) {
        let value = self.text.trim();
        let slot = match (field, self.channel.as_mut(), self.item.as_mut()) {
            (Field::ItemTitle, _, Some(item)) => &mut item.title,
            (Field::ItemLink, _, Some(item)) => &mut item.link,
            (Field::ItemPubDate, _, Some(item)) => &mut item.pub_date,
            (Field::ItemDescription, _, Some(item)) => &mut item.description,
            (Field::ChannelTitle, Some(channel), _) => &mut channel.title,
            (Field::ChannelLink, Some(channel), _) => &mut channel.link,
            (Field::ChannelDescription, Some(channel), _) => &mut channel.description,
            (Field::ChannelLanguage, Some(channel), _) => &mut channel.language,
            _ => return,
        };
        if slot.is_empty() {
            *slot = value.to_string();
        }
        self.text.clear();
    }

    fn finish(self) -> Result<RssDocument, ParseError> {
        if let Some(open) = self.path.last() {
            return Err(ParseError::Truncated(
                String::from_utf8_lossy(open).into_owned(),
            ));
        }
        let channel = self.channel.ok_or(ParseError::MissingChannel)?;
        Ok(RssDocument { channel })
    }
}

/// Decode a feed body into an [`RssDocument`].
///
/// Unknown elements (`guid`, `image`, namespaced extensions, ...) are
/// ignored. A body without a `<channel>` element is treated as malformed.
pub fn parse_document(bytes: &[u8]) -> Result<RssDocument, ParseError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    // quick-xml never expands DOCTYPE entity declarations; unknown entities
    // surface as unescape errors.
    let mut reader = Reader::from_reader(bytes);
    let mut builder = DocumentBuilder::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => builder.start(e.name().as_ref())?,
            Event::Empty(e) => builder.empty(e.name().as_ref()),
            Event::Text(t) => builder.text(&t.unescape()?),
            Event::CData(c) => builder.text(&String::from_utf8_lossy(&c)),
            Event::End(_) => builder.end(),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    builder.finish()
}
