//! Rendering note pages to safe HTML.

use std::collections::{HashMap, HashSet};

use exam_core::model::{ImagePosition, NotePage, count_words};

/// Render markdown-like page text to sanitized HTML.
#[must_use]
pub fn markdown_to_html(input: &str) -> String {
    let mut options = pulldown_cmark::Options::empty();
    options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
    options.insert(pulldown_cmark::Options::ENABLE_TABLES);
    options.insert(pulldown_cmark::Options::ENABLE_TASKLISTS);

    let parser = pulldown_cmark::Parser::new_ext(input, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    sanitize_html(&html)
}

#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = [
        "p", "div", "span", "br", "em", "strong", "b", "i", "del", "code", "pre", "blockquote",
        "ul", "ol", "li", "a", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "table", "thead",
        "tbody", "tr", "th", "td", "img", "figure", "figcaption", "input",
    ]
    .into_iter()
    .collect();

    let mut attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    attributes.insert("a", ["href"].into_iter().collect());
    attributes.insert("img", ["src", "alt"].into_iter().collect());
    attributes.insert("input", ["type", "checked", "disabled"].into_iter().collect());
    attributes.insert("figure", ["data-position"].into_iter().collect());

    ammonia::Builder::new()
        .tags(tags)
        .tag_attributes(attributes)
        .clean(html)
        .to_string()
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn figure(page: &NotePage, position: ImagePosition) -> String {
    let mut out = String::new();
    for image in page.images.iter().filter(|i| i.position == position) {
        out.push_str(&format!(
            "<figure data-position=\"{}\"><img src=\"{}\" alt=\"{}\">",
            match position {
                ImagePosition::Top => "top",
                ImagePosition::Middle => "middle",
                ImagePosition::Bottom => "bottom",
                ImagePosition::Inline => "inline",
            },
            escape_attr(image.url.as_str()),
            escape_attr(&image.alt),
        ));
        if let Some(caption) = &image.caption {
            out.push_str(&format!("<figcaption>{}</figcaption>", escape_attr(caption)));
        }
        out.push_str("</figure>");
    }
    out
}

/// Render a whole page: text plus its images in their positions.
///
/// Inline and middle images are placed after the text.
#[must_use]
pub fn render_page(page: &NotePage) -> String {
    let mut html = figure(page, ImagePosition::Top);
    html.push_str(&markdown_to_html(&page.content));
    html.push_str(&figure(page, ImagePosition::Middle));
    html.push_str(&figure(page, ImagePosition::Inline));
    html.push_str(&figure(page, ImagePosition::Bottom));
    sanitize_html(&html)
}

/// Visible word count of a page, ignoring markdown markup.
#[must_use]
pub fn page_word_count(page: &NotePage) -> usize {
    let parser = pulldown_cmark::Parser::new(&page.content);
    let mut text = String::new();
    for event in parser {
        match event {
            pulldown_cmark::Event::Text(t) | pulldown_cmark::Event::Code(t) => {
                text.push_str(&t);
                text.push(' ');
            }
            pulldown_cmark::Event::SoftBreak | pulldown_cmark::Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    count_words(&text)
}
