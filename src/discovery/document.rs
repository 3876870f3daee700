//! Small element tree over `quick-xml`, enough to walk provider documents.
//!
//! Names are stored without namespace prefix, so `<a:Response>` and
//! `<Response xmlns="...">` both answer to `Response`.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::DiscoveryError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Suit un chemin séparé par `/`, premier enfant correspondant à chaque étape.
    pub fn path(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Texte nettoyé de l'enfant `name`, vide s'il est absent.
    pub fn child_text(&self, name: &str) -> &str {
        self.child(name).map(|child| child.text.trim()).unwrap_or("")
    }
}

/// Parsed configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn parse(raw: &str) -> Result<Self, DiscoveryError> {
        let mut reader = Reader::from_str(raw);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(|err| {
                DiscoveryError::malformed(format!(
                    "XML error at byte {}: {err}",
                    reader.buffer_position()
                ))
            })?;
            match event {
                Event::Start(start) => stack.push(open_element(&start)?),
                Event::Empty(start) => {
                    let element = open_element(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DiscoveryError::malformed("unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|err| DiscoveryError::malformed(err.to_string()))?;
                    push_text(&mut stack, &value);
                }
                Event::CData(data) => {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    push_text(&mut stack, &value);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DiscoveryError::malformed("unexpected end of document"));
        }
        root.map(|root| Self { root })
            .ok_or_else(|| DiscoveryError::malformed("document has no root element"))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

/// Remplace les placeholders autoconfig par l'adresse réelle.
pub(crate) fn substitute_placeholders(raw: &str, email: &str, local: &str) -> String {
    raw.replace("%EMAILADDRESS%", email)
        .replace("%EMAILLOCALPART%", local)
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, DiscoveryError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| DiscoveryError::malformed(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| DiscoveryError::malformed(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Element::default()
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DiscoveryError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(DiscoveryError::malformed("multiple root elements")),
    }
}

fn push_text(stack: &mut [Element], value: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(value);
    }
}
