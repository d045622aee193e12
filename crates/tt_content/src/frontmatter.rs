use chrono::NaiveDate;
use tt_core::Frontmatter;

const FENCE: &str = "---";

/// Splits a leading `---` fenced block off `text`.
///
/// Returns the block body and the byte offset where the document body starts.
pub fn split(text: &str) -> Option<(&str, usize)> {
    let start = text.strip_prefix('\u{feff}').map_or(0, |_| '\u{feff}'.len_utf8());
    let rest = &text[start..];
    let first_line_end = rest.find('\n')?;
    if rest[..first_line_end].trim_end() != FENCE {
        return None;
    }

    let body_start = start + first_line_end + 1;
    let mut offset = body_start;
    for line in text[body_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Some((&text[body_start..offset], offset + line.len()));
        }
        offset += line.len();
    }
    None
}

/// Parses the fenced block at the top of `text`. Missing block yields `None`.
pub fn parse(text: &str) -> Option<Frontmatter> {
    split(text).map(|(block, _)| parse_block(block))
}

/// Parses the `key: value` lines of a frontmatter block.
///
/// Values may be double quoted (JSON escapes), single quoted or bare. `tags`
/// may be an inline array or an indented `- item` list.
pub fn parse_block(block: &str) -> Frontmatter {
    let mut fm = Frontmatter::default();
    let mut list_key: Option<String> = None;

    for line in block.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(item) = trimmed.strip_prefix("- ") {
            if list_key.as_deref() == Some("tags") {
                fm.add_tag(scalar(item));
            }
            continue;
        }

        let Some((key, raw)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let raw = raw.trim();
        list_key = raw.is_empty().then(|| key.to_string());

        match key {
            "title" => fm.title = scalar(raw),
            "description" => fm.description = scalar(raw),
            "slug" => fm.slug = Some(scalar(raw)).filter(|s| !s.is_empty()),
            "image" => fm.image = Some(scalar(raw)).filter(|s| !s.is_empty()),
            "pubDate" | "date" => fm.pub_date = parse_date(&scalar(raw)),
            "tags" => {
                for tag in inline_list(raw) {
                    fm.add_tag(tag);
                }
            }
            _ => {}
        }
    }
    fm
}

fn scalar(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw[1..raw.len() - 1].to_string());
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].replace("''", "'");
    }
    raw.to_string()
}

fn inline_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if !(raw.starts_with('[') && raw.ends_with(']')) {
        return if raw.is_empty() { vec![] } else { vec![scalar(raw)] };
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
        return items;
    }
    raw[1..raw.len() - 1]
        .split(',')
        .map(scalar)
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.replace('"', "\\\"")))
}

/// Renders the fenced frontmatter block, trailing newline included.
pub fn render(fm: &Frontmatter) -> String {
    let mut out = String::from("---\n");
    out.push_str(&format!("title: {}\n", quoted(&fm.title)));
    out.push_str(&format!("description: {}\n", quoted(&fm.description)));
    if let Some(slug) = &fm.slug {
        out.push_str(&format!("slug: {}\n", quoted(slug)));
    }
    if let Some(date) = fm.pub_date {
        out.push_str(&format!("pubDate: {}\n", date.format("%Y-%m-%d")));
    }
    let tags = serde_json::to_string(&fm.tags).unwrap_or_else(|_| "[]".to_string());
    out.push_str(&format!("tags: {}\n", tags));
    if let Some(image) = &fm.image {
        out.push_str(&format!("image: {}\n", quoted(image)));
    }
    out.push_str("---\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generated_frontmatter() {
        let text = "---\ntitle: \"Best \\\"Pro\\\" Headsets\"\ndescription: 'Our picks'\nslug: \"best-headsets\"\npubDate: 2025-03-04\ntags: [\"audio\", \"gaming\", \"audio\"]\nimage: \"/images/best-headsets-hero.webp\"\n---\n\nBody";
        let fm = parse(text).unwrap();
        assert_eq!(fm.title, "Best \"Pro\" Headsets");
        assert_eq!(fm.description, "Our picks");
        assert_eq!(fm.slug.as_deref(), Some("best-headsets"));
        assert_eq!(fm.pub_date, NaiveDate::from_ymd_opt(2025, 3, 4));
        assert_eq!(fm.tags, vec!["audio", "gaming"]);
        assert_eq!(fm.image.as_deref(), Some("/images/best-headsets-hero.webp"));
    }

    #[test]
    fn test_parse_yaml_style_list_and_bare_values() {
        let text = "---\ntitle: Best Chairs\npubDate: 2024-11-02T10:00:00Z\ntags:\n  - office\n  - 'ergonomic'\n---\n";
        let fm = parse(text).unwrap();
        assert_eq!(fm.title, "Best Chairs");
        assert_eq!(fm.pub_date, NaiveDate::from_ymd_opt(2024, 11, 2));
        assert_eq!(fm.tags, vec!["office", "ergonomic"]);
        assert!(fm.slug.is_none());
    }

    #[test]
    fn test_split_reports_body_offset() {
        let text = "---\ntitle: x\n---\nhello";
        let (block, body) = split(text).unwrap();
        assert_eq!(block, "title: x\n");
        assert_eq!(&text[body..], "hello");
        assert!(split("no frontmatter here\n").is_none());
        assert!(split("---\ntitle: never closed\n").is_none());
    }

    #[test]
    fn test_render_then_parse() {
        let fm = Frontmatter {
            title: "Top: \"Quoted\" Widgets".to_string(),
            description: "Line one".to_string(),
            pub_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            slug: Some("top-quoted-widgets".to_string()),
            tags: vec!["widgets".to_string(), "home".to_string()],
            image: None,
        };
        assert_eq!(parse(&render(&fm)).unwrap(), fm);
    }
}
