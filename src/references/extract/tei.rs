//! Reader for GROBID TEI XML output.
//!
//! Pulls the header metadata (title, authors, DOI, publication date) and the
//! abstract and body text. `<pb n="..."/>` page breaks split the text into
//! pages; without them everything lands on page 1.

use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::references::chunker::PageText;
use crate::references::model::Author;

/// Metadata and text read from a TEI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeiDocument {
    pub title: Option<String>,
    pub doi: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub authors: Vec<Author>,
    pub pages: Vec<PageText>,
}

#[derive(Default)]
struct AuthorParts {
    forenames: Vec<String>,
    surname: Option<String>,
    email: Option<String>,
}

impl AuthorParts {
    fn into_author(self) -> Option<Author> {
        let mut parts = self.forenames.clone();
        parts.extend(self.surname.clone());
        let full_name = parts.join(" ");
        if full_name.trim().is_empty() {
            return None;
        }
        Some(Author {
            full_name,
            given_name: (!self.forenames.is_empty()).then(|| self.forenames.join(" ")),
            surname: self.surname,
            email: self.email,
        })
    }
}

/// Parse TEI XML. Errors are returned as a message for the caller to attach
/// to the artifact path.
pub fn parse_tei(xml: &str) -> Result<TeiDocument, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = TeiDocument {
        pages: vec![PageText::new(1, String::new())],
        ..Default::default()
    };
    let mut stack: Vec<String> = Vec::new();
    let mut seen_header = false;
    let mut title = String::new();
    let mut doi: Option<String> = None;
    let mut in_doi = false;
    let mut author: Option<AuthorParts> = None;
    let mut paragraph = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "teiHeader" => seen_header = true,
                    "author" if in_source_header(&stack) && stack.iter().any(|s| s == "analytic") => {
                        author = Some(AuthorParts::default());
                    }
                    "idno" => {
                        in_doi = doi.is_none()
                            && attr(&e, "type")?.is_some_and(|t| t.eq_ignore_ascii_case("doi"));
                    }
                    "date" => read_date(&e, &stack, &mut doc)?,
                    "pb" => {
                        flush_paragraph(&mut paragraph, &mut doc);
                        new_page(&e, &mut doc)?;
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => match local_name(&e).as_str() {
                "date" => read_date(&e, &stack, &mut doc)?,
                "pb" => {
                    flush_paragraph(&mut paragraph, &mut doc);
                    new_page(&e, &mut doc)?;
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let top = stack.last().map(String::as_str).unwrap_or_default();

                if in_doi {
                    doi.get_or_insert_with(String::new).push_str(text);
                } else if top == "title" && in_title_stmt(&stack) {
                    push_words(&mut title, text);
                } else if let Some(parts) = author.as_mut() {
                    match top {
                        "forename" => parts.forenames.push(text.to_string()),
                        "surname" => {
                            push_words(parts.surname.get_or_insert_with(String::new), text)
                        }
                        "email" => parts.email = Some(text.to_string()),
                        _ => {}
                    }
                } else if in_content(&stack) {
                    push_words(&mut paragraph, text);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "idno" => in_doi = false,
                    "author" => {
                        if let Some(parts) = author.take() {
                            doc.authors.extend(parts.into_author());
                        }
                    }
                    "p" | "head" => flush_paragraph(&mut paragraph, &mut doc),
                    _ => {}
                }
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!("at byte {}: {e}", reader.buffer_position()));
            }
            _ => {}
        }
    }

    if !seen_header {
        return Err("no <teiHeader> element; not a TEI document".into());
    }
    if !stack.is_empty() {
        return Err(format!("unexpected end of document inside <{}>", stack.join("/")));
    }
    flush_paragraph(&mut paragraph, &mut doc);

    doc.title = (!title.is_empty()).then_some(title);
    doc.doi = doi.filter(|d| !d.is_empty());
    Ok(doc)
}

/// Parse a TEI `when` value: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
pub fn parse_when(when: &str) -> Option<NaiveDate> {
    let mut parts = when.trim().splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next().map_or(Some(1), |m| m.parse().ok())?;
    let day: u32 = parts.next().map_or(Some(1), |d| d.get(..2).unwrap_or(d).parse().ok())?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, String> {
    let Some(attribute) = e.try_get_attribute(name).map_err(|e| e.to_string())? else {
        return Ok(None);
    };
    let value = attribute.unescape_value().map_err(|e| e.to_string())?;
    Ok(Some(value.into_owned()))
}

fn in_source_header(stack: &[String]) -> bool {
    stack.iter().any(|s| s == "teiHeader") && stack.iter().any(|s| s == "sourceDesc")
}

fn in_title_stmt(stack: &[String]) -> bool {
    stack.iter().any(|s| s == "teiHeader") && stack.iter().any(|s| s == "titleStmt")
}

/// Abstract and body paragraphs and headings, excluding figures and notes.
fn in_content(stack: &[String]) -> bool {
    let has = |name: &str| stack.iter().any(|s| s == name);
    (has("abstract") || has("body"))
        && (has("p") || has("head"))
        && !has("figure")
        && !has("note")
}

fn read_date(e: &BytesStart<'_>, stack: &[String], doc: &mut TeiDocument) -> Result<(), String> {
    if doc.published_date.is_some() || !stack.iter().any(|s| s == "teiHeader") {
        return Ok(());
    }
    let parent = stack.last().map(String::as_str);
    if !matches!(parent, Some("publicationStmt" | "imprint")) {
        return Ok(());
    }
    if let Some(when) = attr(e, "when")? {
        doc.published_date = parse_when(&when);
    }
    Ok(())
}

fn new_page(e: &BytesStart<'_>, doc: &mut TeiDocument) -> Result<(), String> {
    let last = doc.pages.last().map_or(0, |p| p.page_num);
    let page_num = attr(e, "n")?
        .and_then(|n| n.trim().parse::<u32>().ok())
        .unwrap_or(last + 1);

    // A break before any text renumbers the current page instead of adding one.
    match doc.pages.last_mut() {
        Some(page) if page.text.is_empty() => page.page_num = page_num,
        _ => doc.pages.push(PageText::new(page_num, String::new())),
    }
    Ok(())
}

fn flush_paragraph(paragraph: &mut String, doc: &mut TeiDocument) {
    if paragraph.is_empty() {
        return;
    }
    if let Some(page) = doc.pages.last_mut() {
        if !page.text.is_empty() {
            page.text.push_str("\n\n");
        }
        page.text.push_str(paragraph);
    }
    paragraph.clear();
}

fn push_words(buffer: &mut String, text: &str) {
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(text);
}
