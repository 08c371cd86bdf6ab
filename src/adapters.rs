use url::Url;

/// Substituted whenever no image can be resolved; a product is never stored
/// with an empty image URL.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300";

/// A single extraction rule, tried against the loaded page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// `<meta property="...">` lookup by property name.
    Meta(&'static str),
    /// CSS selector lookup; the first matching element's text wins.
    Css(&'static str),
}

/// Closed set of site adapters. Adding a site means adding a variant here and
/// registering its hostname token in `resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteAdapter {
    Wasi,
    SimplyTek,
    Daraz,
    Generic,
}

// Generic metadata fallbacks, appended after every site-specific rule list.
const GENERIC_TITLE: &[ExtractionRule] = &[ExtractionRule::Meta("og:title"), ExtractionRule::Css("title")];
const GENERIC_PRICE: &[ExtractionRule] = &[
    ExtractionRule::Css(".product-price"),
    ExtractionRule::Css(".price .amount"),
];
const GENERIC_IMAGE: &[ExtractionRule] = &[ExtractionRule::Meta("og:image")];

impl SiteAdapter {
    /// Maps a URL's host to an adapter. Specific adapters are checked before
    /// the generic fallback.
    pub fn resolve(url: &Url) -> SiteAdapter {
        let host = url.host_str().unwrap_or_default();
        if host.contains("wasi.lk") {
            SiteAdapter::Wasi
        } else if host.contains("simplytek") {
            SiteAdapter::SimplyTek
        } else if host.contains("daraz") {
            SiteAdapter::Daraz
        } else {
            SiteAdapter::Generic
        }
    }

    /// Whether the site populates price content with scripts, requiring a
    /// rendered page instead of a static fetch.
    pub fn requires_render(&self) -> bool {
        matches!(self, SiteAdapter::Daraz)
    }

    pub fn title_rules(&self) -> &'static [ExtractionRule] {
        match self {
            SiteAdapter::Wasi => &[ExtractionRule::Css(".product_title")],
            SiteAdapter::SimplyTek => &[ExtractionRule::Css(".product__title")],
            SiteAdapter::Daraz | SiteAdapter::Generic => &[],
        }
    }

    pub fn price_rules(&self) -> &'static [ExtractionRule] {
        match self {
            SiteAdapter::Wasi => &[
                ExtractionRule::Css(".price ins bdi"),
                ExtractionRule::Css(".price bdi"),
                ExtractionRule::Css(".woocommerce-Price-amount bdi"),
                ExtractionRule::Css(".woocommerce-Price-amount"),
            ],
            SiteAdapter::SimplyTek => &[
                ExtractionRule::Css("#ProductPrice"),
                ExtractionRule::Css(".product__price"),
                ExtractionRule::Css(".price-item--regular"),
            ],
            SiteAdapter::Daraz => &[ExtractionRule::Meta("og:price:amount")],
            SiteAdapter::Generic => &[],
        }
    }

    pub fn image_rules(&self) -> &'static [ExtractionRule] {
        // og:image is the reliable source on every supported site so far
        &[]
    }

    pub fn generic_title_rules(&self) -> &'static [ExtractionRule] {
        GENERIC_TITLE
    }

    pub fn generic_price_rules(&self) -> &'static [ExtractionRule] {
        GENERIC_PRICE
    }

    pub fn generic_image_rules(&self) -> &'static [ExtractionRule] {
        GENERIC_IMAGE
    }
}

/// Brand label shown next to a tracked product, derived from the URL alone.
pub fn site_label(url: &Url) -> String {
    let text = url.as_str();
    if text.contains("wasi") {
        "Wasi.lk".to_string()
    } else if text.contains("simplytek") {
        "SimplyTek".to_string()
    } else if text.contains("daraz") {
        "Daraz".to_string()
    } else if text.contains("directdeal") {
        "DirectDeals".to_string()
    } else if text.contains("dialcom") {
        "Dialcom".to_string()
    } else {
        url.host_str().unwrap_or("Store").to_string()
    }
}
