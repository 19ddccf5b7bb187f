use xenia_core::{ClassSelector, Fragment, TickOutcome};

/// Byte bounds of an element located in HTML text. All offsets sit on tag
/// delimiters, so they are always valid split points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpan {
    pub tag_name: String,
    pub open_start: usize,
    pub open_end: usize,
    pub inner_start: usize,
    pub inner_end: usize,
    pub close_end: usize,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeOutcome {
    Injected(String),
    AlreadyMarked,
    TargetMissing,
}

impl BadgeOutcome {
    pub fn as_tick(&self) -> TickOutcome {
        match self {
            BadgeOutcome::Injected(_) => TickOutcome::Injected,
            BadgeOutcome::AlreadyMarked => TickOutcome::AlreadyMarked,
            BadgeOutcome::TargetMissing => TickOutcome::TargetMissing,
        }
    }
}

struct RawTag {
    start: usize,
    end: usize,
    name: String,
    attrs: String,
    is_close: bool,
    self_closing: bool,
}

fn next_tag(html: &str, from: usize) -> Option<RawTag> {
    let bytes = html.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        if html[i..].starts_with("<!--") {
            match html[i..].find("-->") {
                Some(rel) => {
                    i += rel + 3;
                    continue;
                }
                None => return None,
            }
        }
        let is_close = bytes.get(i + 1) == Some(&b'/');
        let name_start = if is_close { i + 2 } else { i + 1 };
        let mut name_end = name_start;
        while name_end < bytes.len()
            && (bytes[name_end].is_ascii_alphanumeric() || bytes[name_end] == b'-')
        {
            name_end += 1;
        }
        if name_end == name_start {
            // doctype, stray '<', etc.
            i += 1;
            continue;
        }
        let mut j = name_end;
        let mut quote: Option<u8> = None;
        while j < bytes.len() {
            let b = bytes[j];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => break,
                None => {}
            }
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        let self_closing = !is_close && j > name_end && bytes[j - 1] == b'/';
        let attrs_end = if self_closing { j - 1 } else { j };
        return Some(RawTag {
            start: i,
            end: j + 1,
            name: html[name_start..name_end].to_ascii_lowercase(),
            attrs: html[name_end..attrs_end].to_string(),
            is_close,
            self_closing,
        });
    }
    None
}

fn attr_value(attrs: &str, name: &str) -> Option<String> {
    let lower = attrs.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;
    while let Some(rel) = lower[from..].find(name) {
        let at = from + rel;
        from = at + 1;
        if at > 0 && !bytes[at - 1].is_ascii_whitespace() {
            continue;
        }
        let mut i = at + name.len();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let raw = attrs.as_bytes();
        if raw[i] == b'"' || raw[i] == b'\'' {
            let q = raw[i];
            let value_start = i + 1;
            let mut k = value_start;
            while k < raw.len() && raw[k] != q {
                k += 1;
            }
            return Some(attrs[value_start..k].to_string());
        }
        let value_start = i;
        let mut k = value_start;
        while k < raw.len() && !raw[k].is_ascii_whitespace() {
            k += 1;
        }
        return Some(attrs[value_start..k].to_string());
    }
    None
}

/// First element in the text whose `class` attribute contains the selector
/// as a token. Elements whose close tag never appears are skipped.
pub fn find_class_element(html: &str, class: &ClassSelector) -> Option<ElementSpan> {
    let mut cursor = 0;
    while let Some(tag) = next_tag(html, cursor) {
        cursor = tag.end;
        if tag.is_close {
            continue;
        }
        let matched = attr_value(&tag.attrs, "class")
            .map(|v| class.matches_attr(&v))
            .unwrap_or(false);
        if !matched {
            continue;
        }
        if tag.self_closing {
            return Some(ElementSpan {
                tag_name: tag.name,
                open_start: tag.start,
                open_end: tag.end,
                inner_start: tag.end,
                inner_end: tag.end,
                close_end: tag.end,
                self_closing: true,
            });
        }
        if let Some((inner_end, close_end)) = find_matching_close(html, tag.end, &tag.name) {
            return Some(ElementSpan {
                tag_name: tag.name,
                open_start: tag.start,
                open_end: tag.end,
                inner_start: tag.end,
                inner_end,
                close_end,
                self_closing: false,
            });
        }
        // unclosed container; keep scanning past it
    }
    None
}

fn find_matching_close(html: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let mut depth = 1u32;
    let mut cursor = from;
    while let Some(tag) = next_tag(html, cursor) {
        cursor = tag.end;
        if tag.name != name {
            continue;
        }
        if tag.is_close {
            depth -= 1;
            if depth == 0 {
                return Some((tag.start, tag.end));
            }
        } else if !tag.self_closing {
            depth += 1;
        }
    }
    None
}

/// Whether any element opening inside the slice carries the class.
pub fn contains_class(html: &str, class: &ClassSelector) -> bool {
    let mut cursor = 0;
    while let Some(tag) = next_tag(html, cursor) {
        cursor = tag.end;
        if tag.is_close {
            continue;
        }
        if attr_value(&tag.attrs, "class")
            .map(|v| class.matches_attr(&v))
            .unwrap_or(false)
        {
            return true;
        }
    }
    false
}

/// One-shot badge pass over HTML text: locate the target container, leave
/// the text untouched when the container is absent or already carries the
/// marker, otherwise replace the container's entire content with the
/// rendered fragment.
pub fn inject_badge(
    html: &str,
    target: &ClassSelector,
    marker: &ClassSelector,
    fragment: &Fragment,
) -> BadgeOutcome {
    let Some(span) = find_class_element(html, target) else {
        return BadgeOutcome::TargetMissing;
    };
    if contains_class(&html[span.inner_start..span.inner_end], marker) {
        return BadgeOutcome::AlreadyMarked;
    }

    let rendered = fragment.render();
    let mut result = String::with_capacity(html.len() + rendered.len());
    if span.self_closing {
        let open = &html[span.open_start..span.open_end];
        let open = open[..open.len() - 2].trim_end();
        result.push_str(&html[..span.open_start]);
        result.push_str(open);
        result.push('>');
        result.push_str(&rendered);
        result.push_str("</");
        result.push_str(&span.tag_name);
        result.push('>');
        result.push_str(&html[span.close_end..]);
    } else {
        result.push_str(&html[..span.inner_start]);
        result.push_str(&rendered);
        result.push_str(&html[span.inner_end..]);
    }
    BadgeOutcome::Injected(result)
}

/// The stock pass: `.watermark` container, `.powered-by-xenia` marker,
/// default badge fragment.
pub fn inject_watermark_badge(html: &str) -> BadgeOutcome {
    inject_badge(
        html,
        &ClassSelector::watermark(),
        &ClassSelector::badge(),
        &Fragment::badge(),
    )
}
