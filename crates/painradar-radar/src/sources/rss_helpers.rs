//! RSS item extraction and HTML stripping.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::RadarError;

/// The fields of one `<item>` the adapters care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RssItem {
    pub(crate) title: String,
    pub(crate) link: String,
    pub(crate) guid: String,
    pub(crate) description: String,
    pub(crate) creator: String,
    pub(crate) pub_date: String,
}

/// Parse every `<item>` of an RSS 2.0 feed.
///
/// # Errors
///
/// Returns [`RadarError::Xml`] if the XML is malformed.
pub(crate) fn parse_rss_items(xml: &str) -> Result<Vec<RssItem>, RadarError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current = RssItem::default();
    let mut in_item = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    in_item = true;
                    current = RssItem::default();
                } else {
                    current_tag = name;
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" && in_item {
                    in_item = false;
                    items.push(std::mem::take(&mut current));
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default();
                    append_field(&mut current, &current_tag, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref());
                    append_field(&mut current, &current_tag, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(RadarError::Xml(e)),
            _ => {}
        }
    }

    Ok(items)
}

fn append_field(item: &mut RssItem, tag: &str, text: &str) {
    let field = match tag {
        "title" => &mut item.title,
        "link" => &mut item.link,
        "guid" => &mut item.guid,
        "description" => &mut item.description,
        "dc:creator" | "author" => &mut item.creator,
        "pubDate" => &mut item.pub_date,
        _ => return,
    };
    field.push_str(text);
}

/// Strip HTML tags and collapse whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
