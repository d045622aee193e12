use serde_json::json;
use tt_core::{Article, Frontmatter, Result, TierList};

use crate::frontmatter;
use crate::tierlist::{self, Attr, ParseMethod};

pub const COMPONENT_IMPORT: &str = "import TierList from '../../components/TierList.astro'";

const CRITERIA: [&str; 5] = [
    "Performance and reliability",
    "Value for money",
    "User reviews and satisfaction",
    "Build quality and features",
    "Long-term durability",
];

/// A content file split around its `<TierList>` component.
///
/// Everything outside the component is kept as-is, so rendering a document
/// whose tiers were not touched gives back the original text.
#[derive(Debug, Clone)]
pub struct TierListDocument {
    pub frontmatter: Option<Frontmatter>,
    pub attrs: Vec<Attr>,
    pub tiers: TierList,
    pub method: ParseMethod,
    before: String,
    after: String,
}

impl TierListDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let component = tierlist::parse(text)?;
        Ok(Self {
            frontmatter: frontmatter::parse(text),
            before: text[..component.start].to_string(),
            after: text[component.end..].to_string(),
            attrs: component.attrs,
            tiers: component.tiers,
            method: component.method,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.before.len() + self.after.len() + 4096);
        out.push_str(&self.before);
        out.push_str(&tierlist::render(&self.attrs, &self.tiers));
        out.push_str(&self.after);
        out
    }

    pub fn title(&self) -> Option<&str> {
        self.frontmatter
            .as_ref()
            .map(|fm| fm.title.as_str())
            .filter(|t| !t.is_empty())
    }

    /// The component's `category` attribute.
    pub fn category(&self) -> Option<&str> {
        self.attrs.iter().find_map(|attr| match &attr.value {
            tierlist::AttrValue::Text(value) if attr.name == "category" => Some(value.as_str()),
            _ => None,
        })
    }
}

fn structured_data(article: &Article) -> String {
    let items: Vec<_> = article
        .tiers
        .products()
        .enumerate()
        .map(|(i, (_, product))| {
            json!({
                "@type": "Product",
                "name": product.name,
                "position": i + 1,
            })
        })
        .collect();
    let data = json!({
        "@context": "https://schema.org",
        "@type": "ItemList",
        "name": article.frontmatter.title,
        "itemListElement": items,
    });
    serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string())
}

/// Renders a freshly generated article as a complete content file.
pub fn render_article(article: &Article) -> String {
    let category = article
        .category
        .clone()
        .or_else(|| article.frontmatter.tags.first().cloned())
        .unwrap_or_else(|| "products".to_string());
    let attrs = vec![Attr::text("category", category), Attr::tiers()];

    let mut out = frontmatter::render(&article.frontmatter);
    out.push('\n');
    out.push_str(COMPONENT_IMPORT);
    out.push_str("\n\n");
    out.push_str(&format!("# {}\n\n", article.frontmatter.title));
    out.push_str(article.introduction.trim());
    out.push_str("\n\n");
    out.push_str(&tierlist::render(&attrs, &article.tiers));
    out.push_str("\n\n## 🎯 What We Looked For\n\n");
    for criterion in CRITERIA {
        out.push_str(&format!("- {}\n", criterion));
    }
    out.push_str("\n## 📦 Summary\n\n");
    out.push_str(article.summary.trim());
    out.push_str("\n\n<script type=\"application/ld+json\">\n");
    out.push_str(&structured_data(article));
    out.push_str("\n</script>\n");
    out
}
