use super::dom::{element_ancestors, element_text, find_by_id, has_ancestor_named, selector};
use crate::models::PhotoMeta;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;

static IM_WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]im_w=(\d+)").expect("valid im_w regex"));

static BACKGROUND_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"background-image\s*:\s*url\(\s*['"]?([^'")]+?)['"]?\s*\)"#)
        .expect("valid background regex")
});

/// Auto-numbered labels such as "Image 3", "Listing image 1" or "Photo 2 of 40"
static GENERIC_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:listing\s+)?(?:image|photo|picture)\s*\d+(?:\s*(?:of|/)\s*\d+)?\s*$")
        .expect("valid generic label regex")
});

static GENERIC_BUTTON_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:listing\s+)?(?:image|photo|picture)\s*\d+(?:\s*(?:of|/)\s*\d+)?\s*$")
        .expect("valid generic button regex")
});

/// How far up the tree caption lookups may walk
const MAX_ANCESTOR_DEPTH: usize = 8;
const MAX_BUTTON_CAPTION_CHARS: usize = 120;

/// Whether a label is an auto-generated placeholder rather than a caption
pub fn is_generic_label(label: &str) -> bool {
    GENERIC_LABEL.is_match(label.trim())
}

/// Parse a `srcset` attribute into `(url, width)` pairs; density descriptors give width 0
pub fn parse_srcset(srcset: &str) -> Vec<(String, u32)> {
    srcset
        .split(',')
        .filter_map(|candidate| {
            let mut parts = candidate.split_whitespace();
            let url = parts.next()?;
            let width = parts
                .next()
                .and_then(|d| d.strip_suffix('w'))
                .and_then(|w| w.parse().ok())
                .unwrap_or(0);
            Some((url.to_string(), width))
        })
        .collect()
}

/// Width hinted by the image CDN's `im_w` resize parameter, 0 when absent
pub fn extract_im_width(url: &str) -> u32 {
    IM_WIDTH
        .captures(url)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Collect photos from the page and the optional photo modal, deduplicated by URL
pub fn extract_photos(page: &Html, modal: Option<&Html>) -> Vec<PhotoMeta> {
    let mut seen = HashSet::new();
    let mut photos = Vec::new();
    collect_photos(page, &mut seen, &mut photos);
    if let Some(modal) = modal {
        collect_photos(modal, &mut seen, &mut photos);
    }
    photos
}

/// Legacy galleries label every image "Image N" instead of captioning it
pub fn detect_legacy_gallery(page: &Html, modal: Option<&Html>) -> bool {
    std::iter::once(page)
        .chain(modal)
        .any(|doc| has_generic_attribute(doc) || has_generic_button(doc))
}

fn has_generic_attribute(doc: &Html) -> bool {
    let Some(sel) = selector("[aria-label], [alt], [title]") else {
        return false;
    };
    doc.select(&sel).any(|el| {
        ["aria-label", "alt", "title"]
            .iter()
            .filter_map(|attr| el.value().attr(attr))
            .any(is_generic_label)
    })
}

fn has_generic_button(doc: &Html) -> bool {
    let Some(sel) = selector("button") else {
        return false;
    };
    doc.select(&sel)
        .any(|button| GENERIC_BUTTON_TEXT.is_match(&element_text(&button)))
}

fn collect_photos(doc: &Html, seen: &mut HashSet<String>, photos: &mut Vec<PhotoMeta>) {
    let mut push = |photo: PhotoMeta| {
        if seen.insert(photo.url.clone()) {
            photos.push(photo);
        }
    };

    if let (Some(picture_sel), Some(source_sel), Some(img_sel)) =
        (selector("picture"), selector("source"), selector("img"))
    {
        for picture in doc.select(&picture_sel) {
            let img = picture.select(&img_sel).next();
            let mut candidates: Vec<(String, u32)> = picture
                .select(&source_sel)
                .filter_map(|s| s.value().attr("srcset"))
                .flat_map(parse_srcset)
                .collect();
            if let Some(srcset) = img.and_then(|i| i.value().attr("srcset")) {
                candidates.extend(parse_srcset(srcset));
            }
            if candidates.is_empty() {
                if let Some(src) = img.and_then(|i| i.value().attr("src")).filter(|s| !s.is_empty()) {
                    candidates.push((src.to_string(), extract_im_width(src)));
                }
            }
            let anchor = img.unwrap_or(picture);
            if let Some(photo) = build_photo(doc, &anchor, candidates) {
                push(photo);
            }
        }

        for img in doc.select(&img_sel) {
            if has_ancestor_named(&img, "picture") {
                continue;
            }
            let mut candidates = img
                .value()
                .attr("srcset")
                .map(parse_srcset)
                .unwrap_or_default();
            if candidates.is_empty() {
                // Bare <img> without a resize hint is usually an icon or avatar
                if let Some(src) = img.value().attr("src").filter(|s| s.contains("im_w=")) {
                    candidates.push((src.to_string(), extract_im_width(src)));
                }
            }
            if let Some(photo) = build_photo(doc, &img, candidates) {
                push(photo);
            }
        }
    }

    if let Some(bg_sel) = selector(r#"[style*="background-image"]"#) {
        for el in doc.select(&bg_sel) {
            let Some(style) = el.value().attr("style") else { continue };
            let Some(url) = BACKGROUND_URL
                .captures(style)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
            else {
                continue;
            };
            let width = extract_im_width(&url);
            if let Some(photo) = build_photo(doc, &el, vec![(url, width)]) {
                push(photo);
            }
        }
    }
}

fn build_photo(doc: &Html, anchor: &ElementRef<'_>, candidates: Vec<(String, u32)>) -> Option<PhotoMeta> {
    let resolved: Vec<(String, u32)> = candidates
        .into_iter()
        .filter(|(url, _)| !url.is_empty() && !url.starts_with("data:"))
        .map(|(url, width)| {
            let width = if width > 0 { width } else { extract_im_width(&url) };
            (url, width)
        })
        .collect();

    // First candidate wins ties
    let (url, width) = resolved
        .iter()
        .fold(None::<&(String, u32)>, |best, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })?
        .clone();

    let height = anchor.value().attr("height").and_then(|h| h.parse().ok());

    Some(PhotoMeta {
        url,
        width: (width > 0).then_some(width),
        height,
        alt: resolve_alt(doc, anchor),
        srcset: resolved.into_iter().map(|(url, _)| url).collect(),
    })
}

/// Find the first real caption for an image.
///
/// The site often leaves `alt` as "Image N" and puts the caption on a wrapper
/// several levels up, so this walks outwards through labelling attributes.
pub fn resolve_alt(doc: &Html, element: &ElementRef<'_>) -> Option<String> {
    let accept = |value: &str| -> Option<String> {
        let cleaned = value.split_whitespace().collect::<Vec<_>>().join(" ");
        (!cleaned.is_empty() && !is_generic_label(&cleaned)).then_some(cleaned)
    };

    let attrs = element.value();
    for attr in ["alt", "aria-label", "title"] {
        if let Some(found) = attrs.attr(attr).and_then(accept) {
            return Some(found);
        }
    }
    if let Some(found) = referenced_label(doc, element).and_then(|t| accept(&t)) {
        return Some(found);
    }

    let scope: Vec<ElementRef<'_>> = element_ancestors(element)
        .take(MAX_ANCESTOR_DEPTH)
        .take_while(|a| a.value().name() != "body" && a.value().attr("role") != Some("dialog"))
        .collect();

    for ancestor in &scope {
        if let Some(found) = ancestor.value().attr("aria-label").and_then(accept) {
            return Some(found);
        }
        if let Some(found) = referenced_label(doc, ancestor).and_then(|t| accept(&t)) {
            return Some(found);
        }
    }

    for button in scope.iter().filter(|a| a.value().name() == "button") {
        if let Some(found) = button.value().attr("title").and_then(accept) {
            return Some(found);
        }
        let text = element_text(button);
        if text.chars().count() <= MAX_BUTTON_CAPTION_CHARS {
            if let Some(found) = accept(&text) {
                return Some(found);
            }
        }
    }

    scope
        .iter()
        .filter(|a| a.value().attr("role") == Some("img"))
        .find_map(|a| a.value().attr("aria-label").and_then(accept))
}

fn referenced_label(doc: &Html, element: &ElementRef<'_>) -> Option<String> {
    ["aria-labelledby", "aria-describedby"]
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .flat_map(str::split_whitespace)
        .filter_map(|id| find_by_id(doc, id))
        .map(|target| element_text(&target))
        .find(|text| !text.is_empty() && !is_generic_label(text))
}
