//! The `<TierList tiers={{ ... }} />` component block.
//!
//! Reading tries three strategies in order: the `tiers` expression as strict
//! JSON, then as a JavaScript object literal, then a line-oriented salvage of
//! the product props. Writing always produces the same layout.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use tt_core::{Error, ImageSource, Product, Result, Tier, TierList};

use crate::literal;

pub const COMPONENT_NAME: &str = "TierList";
const TIERS_PROP: &str = "tiers";

const KNOWN_PROPS: [&str; 6] = ["name", "review", "link", "price", "image", "imageSource"];

lazy_static! {
    static ref SALVAGE_END: Regex = Regex::new(r"\}\s*\}\s*/>").unwrap();
    static ref SALVAGE_TIER: Regex = Regex::new(r#""([^"\n]+)"\s*:\s*[\[{]"#).unwrap();
    static ref SALVAGE_PRODUCT: Regex = Regex::new(r"\{[^{}]*\}").unwrap();
    static ref SALVAGE_LABEL: Regex = Regex::new(r#"label\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap();
}

/// How the tiers expression was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMethod {
    Json,
    Literal,
    Salvage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `name="text"`
    Text(String),
    /// `name={expression}`
    Expr(Value),
    /// Position of the `tiers` prop; rendered from the tier list.
    Tiers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: AttrValue,
}

impl Attr {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Text(value.into()),
        }
    }

    pub fn tiers() -> Self {
        Self {
            name: TIERS_PROP.to_string(),
            value: AttrValue::Tiers,
        }
    }
}

/// A located and parsed component invocation.
#[derive(Debug, Clone)]
pub struct Component {
    /// Byte offset of `<TierList`.
    pub start: usize,
    /// Byte offset just past `/>`.
    pub end: usize,
    pub attrs: Vec<Attr>,
    pub tiers: TierList,
    pub method: ParseMethod,
}

impl Component {
    pub fn text_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find_map(|attr| match &attr.value {
            AttrValue::Text(value) if attr.name == name => Some(value.as_str()),
            _ => None,
        })
    }
}

fn find_starts(text: &str) -> Vec<usize> {
    let needle = format!("<{}", COMPONENT_NAME);
    let mut starts = Vec::new();
    let mut from = 0;
    while let Some(found) = text[from..].find(&needle) {
        let start = from + found;
        let after = text[start + needle.len()..].chars().next();
        if matches!(after, Some(c) if c.is_whitespace() || c == '/') {
            starts.push(start);
        }
        from = start + needle.len();
    }
    starts
}

fn skip_ws(text: &str, pos: usize) -> usize {
    let rest = &text[pos..];
    pos + (rest.len() - rest.trim_start().len())
}

/// Locates and parses the component in `text`.
///
/// A `<TierList` mention that is not a valid invocation (prose, code samples)
/// is skipped in favour of the next one.
pub fn parse(text: &str) -> Result<Component> {
    let mut first_error = None;
    for start in find_starts(text) {
        match parse_at(text, start) {
            Ok(component) => return Ok(component),
            Err(e) => {
                debug!("Skipping <{}> at byte {}: {}", COMPONENT_NAME, start, e);
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or_else(|| Error::Parse(format!("No <{}> component found", COMPONENT_NAME))))
}

fn parse_at(text: &str, start: usize) -> Result<Component> {
    let mut pos = start + COMPONENT_NAME.len() + 1;
    let mut attrs = Vec::new();
    let mut tiers = None;

    loop {
        pos = skip_ws(text, pos);
        let rest = &text[pos..];
        if rest.starts_with("/>") {
            pos += 2;
            break;
        }
        if rest.is_empty() {
            return Err(Error::Parse("Unterminated component".to_string()));
        }

        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':')))
            .unwrap_or(rest.len());
        if name_len == 0 {
            return Err(Error::Parse(format!("Unexpected character in component at byte {}", pos)));
        }
        let name = rest[..name_len].to_string();
        pos = skip_ws(text, pos + name_len);

        if !text[pos..].starts_with('=') {
            attrs.push(Attr {
                name,
                value: AttrValue::Expr(Value::Bool(true)),
            });
            continue;
        }
        pos = skip_ws(text, pos + 1);

        match text[pos..].chars().next() {
            Some(q @ ('"' | '\'')) => {
                let close = text[pos + 1..]
                    .find(q)
                    .ok_or_else(|| Error::Parse(format!("Unterminated {} attribute", name)))?;
                let value = decode_entities(&text[pos + 1..pos + 1 + close]);
                pos += close + 2;
                attrs.push(Attr {
                    name,
                    value: AttrValue::Text(value),
                });
            }
            Some('{') if name == TIERS_PROP => {
                let (parsed, method, end) = match parse_expression(text, pos + 1) {
                    Ok((value, method, end)) => (tiers_from_value(&value)?, method, end),
                    Err(e) => {
                        debug!("Structured parse of tiers failed: {}", e);
                        let (salvaged, end) = salvage(text, pos + 1)?;
                        return Ok(Component {
                            start,
                            end,
                            attrs: {
                                attrs.push(Attr::tiers());
                                attrs
                            },
                            tiers: salvaged,
                            method: ParseMethod::Salvage,
                        });
                    }
                };
                pos = end;
                attrs.push(Attr::tiers());
                tiers = Some((parsed, method));
            }
            Some('{') => {
                let (value, _, end) = parse_expression(text, pos + 1)?;
                pos = end;
                attrs.push(Attr {
                    name,
                    value: AttrValue::Expr(value),
                });
            }
            _ => return Err(Error::Parse(format!("Unsupported value for attribute {}", name))),
        }
    }

    let (tiers, method) = tiers.ok_or_else(|| Error::Parse(format!("<{}> has no tiers prop", COMPONENT_NAME)))?;
    Ok(Component {
        start,
        end: pos,
        attrs,
        tiers,
        method,
    })
}

/// Decodes the entities [`render`] writes into text attributes.
fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"").replace("&#39;", "'").replace("&amp;", "&")
}

/// Parses `{ expression }` contents starting at `pos` (just past the opening brace).
///
/// Returns the value, the strategy that worked, and the offset past the closing brace.
fn parse_expression(text: &str, pos: usize) -> Result<(Value, ParseMethod, usize)> {
    let expr = &text[pos..];
    let mut stream = serde_json::Deserializer::from_str(expr).into_iter::<Value>();
    let (value, method, consumed) = match stream.next() {
        Some(Ok(value)) => (value, ParseMethod::Json, stream.byte_offset()),
        _ => {
            let (value, consumed) = literal::parse_value_prefix(expr)?;
            (value, ParseMethod::Literal, consumed)
        }
    };
    let after = skip_ws(text, pos + consumed);
    if !text[after..].starts_with('}') {
        return Err(Error::Parse(format!("Expected '}}' closing expression at byte {}", after)));
    }
    Ok((value, method, after + 1))
}

/// Converts a parsed tiers expression into a [`TierList`].
///
/// Each tier is either an array of products or an object with `label` and `products`.
pub fn tiers_from_value(value: &Value) -> Result<TierList> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Parse("tiers must be an object".to_string()))?;

    let mut tiers = Vec::with_capacity(object.len());
    for (key, tier_value) in object {
        let (label, products) = match tier_value {
            Value::Array(items) => (None, items.as_slice()),
            Value::Object(obj) => {
                let products = obj
                    .get("products")
                    .and_then(Value::as_array)
                    .ok_or_else(|| Error::Parse(format!("tier {} has no products array", key)))?;
                let label = obj.get("label").and_then(Value::as_str).map(str::to_string);
                (label, products.as_slice())
            }
            _ => return Err(Error::Parse(format!("tier {} is neither a list nor an object", key))),
        };

        let products = products.iter().filter_map(product_from_value).collect();
        tiers.push(Tier {
            key: key.clone(),
            label,
            products,
        });
    }
    Ok(TierList::new(tiers))
}

fn string_prop(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_image_source(raw: &str, product: &str) -> Option<ImageSource> {
    match raw.parse::<ImageSource>() {
        Ok(source) => Some(source),
        Err(e) => {
            warn!("⚠️ {} ({}), dropping tag", e, product);
            None
        }
    }
}

/// Reads one product object. Entries without a name are skipped.
fn product_from_value(value: &Value) -> Option<Product> {
    let obj = value.as_object()?;
    let name = string_prop(obj, "name").filter(|n| !n.trim().is_empty())?;

    let image_source = string_prop(obj, "imageSource")
        .filter(|s| !s.is_empty())
        .and_then(|s| parse_image_source(&s, &name));
    let extra = obj
        .iter()
        .filter(|(k, _)| !KNOWN_PROPS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Some(Product {
        review: string_prop(obj, "review").unwrap_or_default(),
        link: string_prop(obj, "link").unwrap_or_default(),
        price: string_prop(obj, "price"),
        image: string_prop(obj, "image").filter(|s| !s.trim().is_empty()),
        image_source,
        extra,
        name,
    })
}

fn salvage_prop(object_text: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"(?:^|[\s{{,"']){}["']?\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(object_text)?.get(1)?.as_str();
    Some(serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string()))
}

/// Last-resort reconstruction from `name: "..."`-style props.
///
/// `pos` is just past the opening brace of the tiers expression. Returns the
/// tiers and the offset just past the component's `/>`.
fn salvage(text: &str, pos: usize) -> Result<(TierList, usize)> {
    let end_match = SALVAGE_END
        .find(&text[pos..])
        .ok_or_else(|| Error::Parse("Could not find the end of the tiers block".to_string()))?;
    let region = &text[pos..pos + end_match.start()];

    let headers: Vec<(usize, String)> = SALVAGE_TIER
        .captures_iter(region)
        .filter_map(|caps| {
            let key = caps.get(1)?;
            (!KNOWN_PROPS.contains(&key.as_str()) && key.as_str() != "label" && key.as_str() != "products")
                .then(|| (key.start(), key.as_str().to_string()))
        })
        .collect();
    if headers.is_empty() {
        return Err(Error::Parse("No tier definitions found".to_string()));
    }

    let mut tiers: Vec<Tier> = headers.iter().map(|(_, key)| Tier::new(key.clone(), vec![])).collect();
    for (i, (header_pos, _)) in headers.iter().enumerate() {
        let tier_end = headers.get(i + 1).map(|(p, _)| *p).unwrap_or(region.len());
        let tier_text = &region[*header_pos..tier_end];
        if let Some(caps) = SALVAGE_LABEL.captures(tier_text) {
            tiers[i].label = serde_json::from_str::<String>(&format!("\"{}\"", &caps[1])).ok();
        }
    }

    for product_match in SALVAGE_PRODUCT.find_iter(region) {
        let object_text = product_match.as_str();
        let Some(name) = salvage_prop(object_text, "name").filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        let Some(tier_index) = headers.iter().rposition(|(p, _)| *p < product_match.start()) else {
            continue;
        };
        let image_source = salvage_prop(object_text, "imageSource").and_then(|s| parse_image_source(&s, &name));
        tiers[tier_index].products.push(Product {
            review: salvage_prop(object_text, "review").unwrap_or_default(),
            link: salvage_prop(object_text, "link").unwrap_or_default(),
            price: salvage_prop(object_text, "price"),
            image: salvage_prop(object_text, "image").filter(|s| !s.trim().is_empty()),
            image_source,
            extra: Map::new(),
            name,
        });
    }

    Ok((TierList::new(tiers), pos + end_match.end()))
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn render_product(product: &Product) -> String {
    let mut props = vec![format!("name: {}", js_string(&product.name))];
    if !product.review.is_empty() {
        props.push(format!("review: {}", js_string(&product.review)));
    }
    if !product.link.is_empty() {
        props.push(format!("link: {}", js_string(&product.link)));
    }
    if let Some(price) = &product.price {
        props.push(format!("price: {}", js_string(price)));
    }
    if let Some(image) = &product.image {
        props.push(format!("image: {}", js_string(image)));
    }
    if let Some(source) = product.image_source {
        props.push(format!("imageSource: {}", js_string(source.as_str())));
    }
    for (key, value) in &product.extra {
        let key = if is_identifier(key) { key.clone() } else { js_string(key) };
        props.push(format!("{}: {}", key, serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())));
    }
    format!("{{ {} }}", props.join(", "))
}

fn render_products(products: &[Product], indent: &str) -> String {
    if products.is_empty() {
        return "[]".to_string();
    }
    let lines: Vec<String> = products
        .iter()
        .map(|p| format!("{}  {}", indent, render_product(p)))
        .collect();
    format!("[\n{}\n{}]", lines.join(",\n"), indent)
}

/// Renders the `{ ... }` tiers expression (without the surrounding prop braces).
pub fn render_tiers(tiers: &TierList) -> String {
    let entries: Vec<String> = tiers
        .tiers
        .iter()
        .map(|tier| match &tier.label {
            Some(label) => format!(
                "    {}: {{\n      label: {},\n      products: {}\n    }}",
                js_string(&tier.key),
                js_string(label),
                render_products(&tier.products, "      ")
            ),
            None => format!("    {}: {}", js_string(&tier.key), render_products(&tier.products, "    ")),
        })
        .collect();
    format!("{{\n{}\n  }}", entries.join(",\n"))
}

/// Renders the whole component invocation.
pub fn render(attrs: &[Attr], tiers: &TierList) -> String {
    let mut out = format!("<{}", COMPONENT_NAME);
    for attr in attrs {
        out.push_str("\n  ");
        match &attr.value {
            AttrValue::Text(value) => {
                let escaped = value.replace('&', "&amp;").replace('"', "&quot;");
                out.push_str(&format!("{}=\"{}\"", attr.name, escaped));
            }
            AttrValue::Expr(Value::Bool(true)) => out.push_str(&attr.name),
            AttrValue::Expr(value) => {
                let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
                out.push_str(&format!("{}={{{}}}", attr.name, json));
            }
            AttrValue::Tiers => out.push_str(&format!("{}={{{}}}", attr.name, render_tiers(tiers))),
        }
    }
    out.push_str("\n/>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATED: &str = r#"intro text

<TierList
  category="gaming headsets"
  tiers={{
    "S": {
        "label": "Top Picks",
        "products": [
            {
                "name": "HyperX Cloud Alpha",
                "image": "",
                "link": "https://www.amazon.com/s?k=HyperX+Cloud+Alpha&tag=trendtiers-20",
                "review": "Rich sound."
            }
        ]
    },
    "A": {
        "label": "Great Options",
        "products": []
    }
}}
/>

outro"#;

    const ENHANCED: &str = r#"<TierList
  tiers={{
    "S": [
      { name: "Steelcase Leap V2", review: "Adjustable \"everything\".", link: "https://www.amazon.com/dp/B00ABCDEFG/?tag=x", image: "https://m.media-amazon.com/images/I/a.jpg", imageSource: "amazon_cdn" },
      { name: "Herman Miller Aeron", review: 'Iconic mesh.', link: "https://a.co/d/xyz", badge: "editor" },
    ],
    B: [
      { name: "Budget Chair", review: "Fine." }
    ]
  }}
/>"#;

    #[test]
    fn test_parse_json_shape_with_labels() {
        let component = parse(GENERATED).unwrap();
        assert_eq!(component.method, ParseMethod::Json);
        assert_eq!(component.text_attr("category"), Some("gaming headsets"));
        assert_eq!(component.tiers.tiers.len(), 2);
        let s = component.tiers.get("S").unwrap();
        assert_eq!(s.label.as_deref(), Some("Top Picks"));
        assert_eq!(s.products[0].name, "HyperX Cloud Alpha");
        assert_eq!(s.products[0].image, None);
        assert!(component.tiers.get("A").unwrap().products.is_empty());
        assert_eq!(&GENERATED[component.end..], "\n\noutro");
    }

    #[test]
    fn test_parse_literal_shape() {
        let component = parse(ENHANCED).unwrap();
        assert_eq!(component.method, ParseMethod::Literal);
        let keys: Vec<&str> = component.tiers.tiers.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["S", "B"]);

        let first = &component.tiers.tiers[0].products[0];
        assert_eq!(first.review, "Adjustable \"everything\".");
        assert_eq!(first.image_source, Some(ImageSource::CatalogCdn));

        let second = &component.tiers.tiers[0].products[1];
        assert_eq!(second.review, "Iconic mesh.");
        assert_eq!(second.extra.get("badge"), Some(&Value::String("editor".to_string())));
        assert_eq!(component.end, ENHANCED.len());
    }

    #[test]
    fn test_salvage_when_expression_is_not_a_literal() {
        let text = r#"<TierList
  tiers={{
    "S": [
      { name: "Widget Pro", review: "Solid.", link: "https://a.co/1", image: someImport },
    ],
    "A": [
      { name: "Widget Lite", link: "https://a.co/2", imageSource: "serpapi_quality" }
    ]
  }}
/>
after"#;
        let component = parse(text).unwrap();
        assert_eq!(component.method, ParseMethod::Salvage);
        assert_eq!(component.tiers.product_count(), 2);
        assert_eq!(component.tiers.tiers[0].products[0].name, "Widget Pro");
        assert_eq!(component.tiers.tiers[0].products[0].image, None);
        assert_eq!(component.tiers.tiers[1].products[0].image_source, Some(ImageSource::SearchQuality));
        assert_eq!(&text[component.end..], "\nafter");
    }

    #[test]
    fn test_missing_component_or_tiers() {
        assert!(parse("# Just markdown").is_err());
        assert!(parse("<TierListing tiers={{}} />").is_err());
        assert!(parse(r#"<TierList category="x" />"#).is_err());
    }

    #[test]
    fn test_skips_prose_mention_of_component() {
        let text = format!("Our <TierList widget ranks products by tier.\n\n{}", GENERATED);
        let component = parse(&text).unwrap();
        assert_eq!(component.text_attr("category"), Some("gaming headsets"));
        assert_eq!(component.tiers.product_count(), 1);
        assert!(component.start > 0);
        assert_eq!(&text[component.end..], "\n\noutro");
    }

    #[test]
    fn test_text_attr_quotes_survive_render() {
        let component = parse(GENERATED).unwrap();
        let attrs = vec![Attr::text("category", r#"7" tablets & e-readers"#), Attr::tiers()];
        let rendered = render(&attrs, &component.tiers);
        assert!(rendered.contains(r#"category="7&quot; tablets &amp; e-readers""#));
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.text_attr("category"), Some(r#"7" tablets & e-readers"#));
    }

    #[test]
    fn test_render_then_parse_keeps_shape() {
        let component = parse(ENHANCED).unwrap();
        let rendered = render(&component.attrs, &component.tiers);
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.tiers, component.tiers);
        assert_eq!(reparsed.end, rendered.len());

        let labelled = parse(GENERATED).unwrap();
        let rendered = render(&labelled.attrs, &labelled.tiers);
        assert!(rendered.contains("label: \"Top Picks\""));
        assert!(rendered.starts_with("<TierList\n  category=\"gaming headsets\"\n  tiers={{"));
        assert_eq!(parse(&rendered).unwrap().tiers, labelled.tiers);
    }

    #[test]
    fn test_render_product_escapes_strings() {
        let mut product = Product::new("Quote \"Q\" Phone", "Line\nbreak", "https://a.co/1");
        product.image_source = Some(ImageSource::SearchRetail);
        let rendered = render_product(&product);
        assert_eq!(
            rendered,
            r#"{ name: "Quote \"Q\" Phone", review: "Line\nbreak", link: "https://a.co/1", imageSource: "search_retail" }"#
        );
    }
}
