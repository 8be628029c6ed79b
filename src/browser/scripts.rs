//! In-page JavaScript run through `Tab::evaluate`.
//!
//! Scripts that hand structured data back return it as a JSON string, which
//! keeps the CDP remote-object handling down to `as_str()`.

pub const PAGE_HTML: &str = "document.documentElement.outerHTML";

pub const PRELOADED_STATE: &str = r#"
(() => {
    try {
        const state = window.__PRELOADED_STATE__;
        return state ? JSON.stringify(state) : null;
    } catch (err) {
        return null;
    }
})()
"#;

pub const DIALOG_OPEN: &str = r#"!!document.querySelector('div[role="dialog"]')"#;

pub const DIALOG_HTML: &str = r#"
(() => {
    const dialog = document.querySelector('div[role="dialog"]');
    return dialog ? dialog.outerHTML : null;
})()
"#;

/// Closes the "translation on" interstitial if it is what opened; true when one was found
pub const DISMISS_TRANSLATION: &str = r#"
(() => {
    const modal = document.querySelector('[data-testid="translation-announce-modal"]');
    const dialog = document.querySelector('div[role="dialog"]');
    const text = dialog ? (dialog.innerText || '').toLowerCase() : '';
    if (!modal && !text.includes('translation settings') && !text.includes('translation on')) {
        return false;
    }
    const scope = modal || dialog;
    const close = scope.querySelector('button[aria-label="Close"]');
    if (close) close.click();
    return true;
})()
"#;

pub const SCROLL_PHOTO_DIALOG: &str = r#"
(async () => {
    const dialog = document.querySelector('div[role="dialog"]');
    if (!dialog) return false;
    const scrollers = dialog.querySelectorAll(
        '[data-testid="structured-gallery-scroll-container"], [data-testid="modal-container"]'
    );
    for (const node of scrollers) {
        node.scrollTop = 0;
        for (let i = 0; i < 60 && node.scrollTop + node.clientHeight < node.scrollHeight; i++) {
            node.scrollBy(0, 600);
            await new Promise((r) => setTimeout(r, 50));
        }
    }
    return true;
})()
"#;

pub const SCROLL_AMENITY_DIALOG: &str = r#"
(() => {
    const dialog = document.querySelector('div[role="dialog"]');
    if (!dialog) return false;
    const container = dialog.querySelector('[data-testid="amenity-modal"]') || dialog;
    let traversed = 0;
    const total = container.scrollHeight;
    while (traversed < total) {
        container.scrollBy(0, 800);
        traversed += 800;
    }
    return true;
})()
"#;

pub const AMENITY_ITEMS: &str = r#"
(() => {
    const dialog = document.querySelector('div[role="dialog"]');
    if (!dialog) return '[]';
    const nodes = dialog.querySelectorAll(
        '[data-testid="pdp-section-amenities-item"], [data-testid="amenity-item"], ul[role="list"] li'
    );
    const results = [];
    nodes.forEach((node) => {
        const text = (node.innerText || '').trim();
        if (text) results.push(text);
    });
    return JSON.stringify(results);
})()
"#;

/// Visible button-like elements as `[{index, text}]`
pub const BUTTON_CANDIDATES: &str = r#"
(() => {
    const buttons = Array.from(document.querySelectorAll('button, a[role="button"]'));
    return JSON.stringify(buttons.map((b, index) => ({
        index,
        text: (b.innerText || b.getAttribute('aria-label') || '').trim(),
    })));
})()
"#;

pub const CLOSE_MODAL: &str = r#"
(() => {
    const labelled = document.querySelector('button[aria-label="Close"]');
    const byText = Array.from(document.querySelectorAll('button'))
        .find((b) => (b.innerText || '').trim() === 'Close');
    const button = labelled || byText;
    if (!button) return false;
    button.click();
    return true;
})()
"#;

/// Scroll the window to the bottom in fixed steps, pausing `pause_ms` between them
pub fn auto_scroll(pause_ms: u64) -> String {
    format!(
        r#"
(async (pause) => {{
    let total = 0;
    for (let step = 0; step < 80; step++) {{
        window.scrollBy(0, 600);
        total += 600;
        await new Promise((r) => setTimeout(r, pause));
        if (total >= document.body.scrollHeight) break;
    }}
    return total;
}})({pause_ms})
"#
    )
}

/// Click the first element matching `css`; true on a click
pub fn click_css(css: &str) -> String {
    format!(
        r#"
(() => {{
    const el = document.querySelector({css});
    if (!el) return false;
    el.click();
    return true;
}})()
"#,
        css = js_string(css)
    )
}

/// Click the first button whose visible text contains `needle` (case-insensitive)
pub fn click_button_with_text(needle: &str) -> String {
    format!(
        r#"
(() => {{
    const needle = {needle}.toLowerCase();
    const el = Array.from(document.querySelectorAll('button'))
        .find((b) => (b.innerText || '').toLowerCase().includes(needle));
    if (!el) return false;
    el.click();
    return true;
}})()
"#,
        needle = js_string(needle)
    )
}

/// Click the button-like element at `index` if its text is still `expected`
pub fn click_button_at(index: usize, expected: &str) -> String {
    format!(
        r#"
(() => {{
    const buttons = Array.from(document.querySelectorAll('button, a[role="button"]'));
    const el = buttons[{index}];
    if (!el) return false;
    const text = (el.innerText || el.getAttribute('aria-label') || '').trim();
    if (text !== {expected}) return false;
    el.click();
    return true;
}})()
"#,
        expected = js_string(expected)
    )
}

/// Quote a Rust string as a JS string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
