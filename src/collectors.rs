use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::warn;

use crate::fetch::PageSnapshot;
use crate::models::{Category, CheckDef, Submission, Task};
use crate::page::Page;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\+\d{1,2}\s)?\(?\d{3}\)?[\s.-]\d{3}[\s.-]\d{4}").unwrap());
static GBP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"google\.com/maps|g\.page|google\.com/business").unwrap());

const SOCIAL_PLATFORMS: [&str; 7] = [
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
];
const REVIEW_PLATFORMS: [&str; 5] = [
    "google.com",
    "yelp.com",
    "trustpilot.com",
    "tripadvisor.com",
    "facebook.com",
];
const CITATION_MARKERS: [&str; 4] = ["bbb.org", "chamber", "yellowpages", "superpages"];
const CHAT_MARKERS: [&str; 8] = [
    "intercom", "drift", "tawk", "crisp", "zendesk", "hubspot", "tidio", "chat",
];
const TRACKING_MARKERS: [&str; 5] = ["googletagmanager", "analytics", "fbq(", "hubspot", "segment"];

const FAST_TTFB: Duration = Duration::from_millis(600);
const TITLE_BAND: (usize, usize) = (10, 70);
const META_BAND: (usize, usize) = (50, 300);

const UNREACHABLE: &str = "Homepage could not be fetched; check skipped.";

pub const L1_NAME: CheckDef = def("L1_NAME", Category::EntityClarity, "Business Name Consistency", "Verifies name on homepage", 3);
pub const L1_NAP: CheckDef = def("L1_NAP", Category::EntityClarity, "NAP Consistency", "Checks for visible phone number", 3);
pub const L1_ABOUT: CheckDef = def("L1_ABOUT", Category::EntityClarity, "About Page Presence", "Identity signal", 3);
pub const L1_CONTACT: CheckDef = def("L1_CONTACT", Category::EntityClarity, "Contact Clarity", "Contact page signal", 3);
pub const L1_SOCIAL: CheckDef = def("L1_SOCIAL", Category::EntityClarity, "Social Profile Linkage", "Identity signal", 4);
pub const L1_SCHEMA: CheckDef = def("L1_SCHEMA", Category::EntityClarity, "Organization Schema", "Identity structured data", 4);
pub const L1_GBP: CheckDef = def("L1_GBP", Category::EntityClarity, "Google Business Link", "Checks for Google Business Profile or Maps link", 4);

pub const L2_HTTPS: CheckDef = def("L2_HTTPS", Category::StructuralAccessibility, "HTTPS / SSL", "Structural security", 3);
pub const L2_ROBOTS: CheckDef = def("L2_ROBOTS", Category::StructuralAccessibility, "Robots.txt", "Crawlability signal", 3);
pub const L2_SITEMAP: CheckDef = def("L2_SITEMAP", Category::StructuralAccessibility, "Sitemap.xml", "Crawlability signal", 3);
pub const L2_CORE_WEB: CheckDef = def("L2_CORE_WEB", Category::StructuralAccessibility, "Core Web Vitals (Proxy)", "TTFB performance", 4);
pub const L2_H1: CheckDef = def("L2_H1", Category::StructuralAccessibility, "H1 Presence", "Structural hierarchy root", 4);
pub const L2_CANONICAL: CheckDef = def("L2_CANONICAL", Category::StructuralAccessibility, "Canonical Tag", "Indexability signal", 3);

pub const L3_TITLE: CheckDef = def("L3_TITLE", Category::SemanticAlignment, "Title Relevance", "Topical alignment", 5);
pub const L3_META: CheckDef = def("L3_META", Category::SemanticAlignment, "Meta Description", "Semantic summary", 5);
pub const L3_HIERARCHY: CheckDef = def("L3_HIERARCHY", Category::SemanticAlignment, "Heading Hierarchy", "Structure of meaning", 5);
pub const L3_FAQ: CheckDef = def("L3_FAQ", Category::SemanticAlignment, "FAQ / Semantic Depth", "FAQ schema or content", 5);

pub const L4_REVIEWS: CheckDef = def("L4_REVIEWS", Category::Authority, "Reviews & Reputation", "Trust signal", 10);
pub const L4_CITATIONS: CheckDef = def("L4_CITATIONS", Category::Authority, "Citations / Directories", "Trust signal", 10);

pub const L5_CHAT: CheckDef = def("L5_CHAT", Category::AutomationReadiness, "Conversational Entry", "Action enablement", 5);
pub const L5_TRACKING: CheckDef = def("L5_TRACKING", Category::AutomationReadiness, "CRM/Tracking Signals", "Action enablement", 5);
pub const L5_CAPTURE: CheckDef = def("L5_CAPTURE", Category::AutomationReadiness, "Lead Capture", "Action enablement", 5);

const fn def(
    id: &'static str,
    category: Category,
    name: &'static str,
    description: &'static str,
    points_possible: u32,
) -> CheckDef {
    CheckDef {
        id,
        category,
        name,
        description,
        points_possible,
    }
}

/// Read-only inputs shared by every collector for one audit.
pub struct AuditContext<'a> {
    pub submission: &'a Submission,
    pub page: Option<&'a Page>,
    pub snapshot: &'a PageSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collector {
    Identity,
    Structural,
    Semantic,
    Authority,
    Automation,
}

impl Collector {
    pub const REGISTRY: [Collector; 5] = [
        Collector::Identity,
        Collector::Structural,
        Collector::Semantic,
        Collector::Authority,
        Collector::Automation,
    ];

    pub fn category(self) -> Category {
        match self {
            Collector::Identity => Category::EntityClarity,
            Collector::Structural => Category::StructuralAccessibility,
            Collector::Semantic => Category::SemanticAlignment,
            Collector::Authority => Category::Authority,
            Collector::Automation => Category::AutomationReadiness,
        }
    }

    /// Runs every check owned by this collector, in rubric order.
    pub fn collect(self, ctx: &AuditContext) -> Vec<Task> {
        match self {
            Collector::Identity => vec![
                on_page(&L1_NAME, ctx, check_business_name),
                on_page(&L1_NAP, ctx, check_phone_number),
                on_page(&L1_ABOUT, ctx, |_, page| nav_link(&L1_ABOUT, page, "about", "About")),
                on_page(&L1_CONTACT, ctx, |_, page| nav_link(&L1_CONTACT, page, "contact", "Contact")),
                on_page(&L1_SOCIAL, ctx, check_social_links),
                on_page(&L1_SCHEMA, ctx, check_org_schema),
                on_page(&L1_GBP, ctx, check_gbp_link),
            ],
            Collector::Structural => vec![
                check_https(ctx.submission),
                check_robots(ctx.snapshot.robots_status),
                check_sitemap(ctx.snapshot.sitemap_status),
                check_ttfb(ctx.snapshot.ttfb),
                on_page(&L2_H1, ctx, check_h1),
                on_page(&L2_CANONICAL, ctx, check_canonical),
            ],
            Collector::Semantic => vec![
                on_page(&L3_TITLE, ctx, check_title),
                on_page(&L3_META, ctx, check_meta_description),
                on_page(&L3_HIERARCHY, ctx, check_heading_hierarchy),
                on_page(&L3_FAQ, ctx, check_faq),
            ],
            Collector::Authority => vec![
                on_page(&L4_REVIEWS, ctx, |_, page| {
                    outbound_links(&L4_REVIEWS, page, &REVIEW_PLATFORMS, "external review profiles")
                }),
                on_page(&L4_CITATIONS, ctx, |_, page| {
                    outbound_links(&L4_CITATIONS, page, &CITATION_MARKERS, "citation/directory links")
                }),
            ],
            Collector::Automation => vec![
                on_page(&L5_CHAT, ctx, check_chat),
                on_page(&L5_TRACKING, ctx, check_tracking),
                on_page(&L5_CAPTURE, ctx, check_capture),
            ],
        }
    }
}

/// Runs a document-backed check. A missing page or a failing query yields an
/// INFO task so sibling checks still run.
fn on_page<F>(check: &CheckDef, ctx: &AuditContext, run: F) -> Task
where
    F: FnOnce(&Submission, &Page) -> anyhow::Result<Task>,
{
    let Some(page) = ctx.page else {
        return check.info(UNREACHABLE);
    };

    match run(ctx.submission, page) {
        Ok(task) => task,
        Err(err) => {
            warn!(check = check.id, error = %err, "Check could not run");
            check.info(format!("Check could not run: {err}"))
        }
    }
}

fn check_business_name(submission: &Submission, page: &Page) -> anyhow::Result<Task> {
    let name = &submission.business_name;
    let task = if page.text().to_lowercase().contains(&name.to_lowercase()) {
        L1_NAME.pass(3, format!("Found '{name}'."))
    } else {
        L1_NAME.warn(format!("Name '{name}' not found exactly."))
    };
    Ok(task)
}

fn check_phone_number(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let text = page.text();
    let matches: Vec<&str> = PHONE_RE.find_iter(&text).map(|m| m.as_str()).take(3).collect();
    let task = if matches.is_empty() {
        L1_NAP.warn("No obvious phone number format found.")
    } else {
        L1_NAP
            .pass(3, "Found potential phone number.")
            .with_evidence("matches", matches)
    };
    Ok(task)
}

fn nav_link(check: &CheckDef, page: &Page, needle: &str, label: &str) -> anyhow::Result<Task> {
    let task = if page.any_text_contains("a[href]", needle)? {
        check.pass(check.points_possible, format!("Found '{label}' page link."))
    } else {
        check.warn(format!("No '{label}' link found."))
    };
    Ok(task)
}

fn check_social_links(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let mut found: Vec<&str> = Vec::new();
    for href in page.link_hrefs()? {
        let href = href.to_lowercase();
        for platform in SOCIAL_PLATFORMS {
            if href.contains(platform) && !found.contains(&platform) {
                found.push(platform);
            }
        }
    }

    let task = match found.len() {
        0 => L1_SOCIAL.warn("No social profile links found."),
        1 => L1_SOCIAL.pass(2, "Linked to 1 social profile."),
        n => L1_SOCIAL.pass(4, format!("Linked to {n} social profiles.")),
    };
    Ok(task.with_evidence("platforms", found))
}

fn check_org_schema(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let found = page
        .json_ld_blocks()?
        .iter()
        .any(|block| block.contains("\"Organization\"") || block.contains("\"LocalBusiness\""));
    let task = if found {
        L1_SCHEMA.pass(4, "Found Organization/LocalBusiness schema.")
    } else {
        L1_SCHEMA.warn("No Organization schema found.")
    };
    Ok(task)
}

fn check_gbp_link(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let link = page
        .link_hrefs()?
        .into_iter()
        .find(|href| GBP_RE.is_match(&href.to_lowercase()));
    let task = match link {
        Some(href) => L1_GBP
            .pass(4, "Found link to Google Business Profile/Maps.")
            .with_evidence("link", href),
        None => L1_GBP.warn("No direct link to Google Business Profile found."),
    };
    Ok(task)
}

fn check_https(submission: &Submission) -> Task {
    if submission.website_url.starts_with("https://") {
        L2_HTTPS.pass(3, "Site uses HTTPS.")
    } else {
        L2_HTTPS.fail("Site does not use HTTPS.")
    }
}

fn check_robots(status: Option<u16>) -> Task {
    match status {
        Some(200) => L2_ROBOTS.pass(3, "Found robots.txt."),
        Some(code) => L2_ROBOTS
            .fail(format!("Robots.txt status {code}."))
            .with_evidence("status", code),
        None => L2_ROBOTS.fail("Could not fetch robots.txt."),
    }
}

fn check_sitemap(status: Option<u16>) -> Task {
    match status {
        Some(200) => L2_SITEMAP.pass(3, "Found sitemap.xml."),
        Some(code) => L2_SITEMAP
            .warn("Sitemap.xml not at root.")
            .with_evidence("status", code),
        None => L2_SITEMAP.warn("Could not check sitemap."),
    }
}

fn check_ttfb(ttfb: Option<Duration>) -> Task {
    let Some(ttfb) = ttfb else {
        return L2_CORE_WEB.info("Response time could not be measured.");
    };

    let seconds = ttfb.as_secs_f64();
    let task = if ttfb < FAST_TTFB {
        L2_CORE_WEB.pass(4, format!("Fast TTFB: {seconds:.2}s"))
    } else {
        L2_CORE_WEB.pass(2, format!("Slow TTFB: {seconds:.2}s"))
    };
    task.with_evidence("ttfb_ms", ttfb.as_millis() as u64)
}

fn check_h1(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let task = match page.count("h1")? {
        1 => L2_H1.pass(4, "Exactly one H1 tag."),
        0 => L2_H1.fail("No H1 tag found. This reduces AI confidence in page hierarchy."),
        n => L2_H1.pass(2, format!("Multiple H1 tags ({n}).")),
    };
    Ok(task)
}

fn check_canonical(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let href = page
        .first_attr(r#"link[rel~="canonical"]"#, "href")?
        .filter(|href| !href.trim().is_empty());
    let task = match href {
        Some(href) => L2_CANONICAL
            .pass(3, "Found canonical tag.")
            .with_evidence("href", href),
        None => L2_CANONICAL.warn("No canonical tag found."),
    };
    Ok(task)
}

fn check_title(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let title = page
        .first_text("title")?
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let task = match title {
        Some(title) => {
            let len = title.chars().count();
            if (TITLE_BAND.0..=TITLE_BAND.1).contains(&len) {
                L3_TITLE.pass(5, "Title exists and is optimized length.")
            } else {
                L3_TITLE.pass(2, format!("Title is {len} characters, outside the optimal 10-70 range."))
            }
        }
        None => L3_TITLE.warn("Title missing."),
    };
    Ok(task)
}

fn check_meta_description(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let content = page.first_attr(r#"meta[name="description"]"#, "content")?;
    let len = content.as_deref().map_or(0, |c| c.chars().count());
    let task = if (META_BAND.0..=META_BAND.1).contains(&len) {
        L3_META.pass(5, "Meta description present.")
    } else {
        L3_META
            .warn("Meta description missing or short.")
            .with_evidence("length", len)
    };
    Ok(task)
}

fn check_heading_hierarchy(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let task = match page.count("h2")? {
        0 => L3_HIERARCHY.warn("No H2 headings found (flat structure)."),
        n => L3_HIERARCHY.pass(5, format!("Found {n} H2 subheadings for content structure.")),
    };
    Ok(task)
}

fn check_faq(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    if page.json_ld_blocks()?.iter().any(|block| block.contains("\"FAQPage\"")) {
        return Ok(L3_FAQ.pass(5, "Found FAQPage Schema."));
    }

    let textual = page.any_text_contains("a", "faq")?
        || page.any_text_contains("h1, h2, h3, h4, h5, h6", "faq")?;
    let task = if textual {
        L3_FAQ.pass(3, "Found FAQ content signals (link/heading).")
    } else {
        L3_FAQ.warn("No FAQ schema or content found.")
    };
    Ok(task)
}

fn outbound_links(check: &CheckDef, page: &Page, markers: &[&str], label: &str) -> anyhow::Result<Task> {
    let found: Vec<String> = page
        .link_hrefs()?
        .into_iter()
        .filter(|href| {
            let href = href.to_lowercase();
            markers.iter().any(|m| href.contains(m))
        })
        .collect();

    let task = if found.is_empty() {
        check.warn(format!("No {label} found on the homepage."))
    } else {
        check
            .pass(check.points_possible, format!("Found {} {label}.", found.len()))
            .with_evidence("links", found)
    };
    Ok(task)
}

fn check_chat(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let html = page.raw_lowercase();
    let task = match CHAT_MARKERS.iter().find(|m| html.contains(*m)) {
        Some(marker) => L5_CHAT
            .pass(5, "Found chat widget/code.")
            .with_evidence("marker", *marker),
        None => L5_CHAT.warn("No chat widget detected."),
    };
    Ok(task)
}

fn check_tracking(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let html = page.raw_lowercase();
    let found: Vec<&str> = TRACKING_MARKERS
        .iter()
        .copied()
        .filter(|m| html.contains(m))
        .collect();
    let task = if found.is_empty() {
        L5_TRACKING.warn("No major tracking/CRM scripts found.")
    } else {
        L5_TRACKING.pass(5, format!("Found tracking signals: {}.", found.join(",")))
    };
    Ok(task)
}

fn check_capture(_: &Submission, page: &Page) -> anyhow::Result<Task> {
    let task = match page.count("form")? {
        0 => L5_CAPTURE.warn("No native HTML forms found."),
        n => L5_CAPTURE.pass(5, format!("Found {n} HTML forms (potential lead capture).")),
    };
    Ok(task)
}
