//! JavaScript evaluated inside target pages
//!
//! Scripts only collect raw DOM text; folding it into the result schema
//! happens in Rust.

/// Collect accordion panels and the headline fields of a reputation page
///
/// Each panel item is either a plain string or a single-key object
/// `{label: value}`. A panel whose body is missing or blank has `items: null`.
pub const REPUTATION_SCRIPT: &str = r#"
    (() => {
        const text = el => (el && el.innerText ? el.innerText : null);
        const result = {
            panels: [],
            totalPercent: null,
            domainAge: null,
            domainDate: null,
            allData: null
        };

        try {
            const accordion = document.querySelector(
                'div.factcesAccordion .AccordionWrapper .accordion'
            );
            if (accordion) {
                accordion.querySelectorAll('.panel').forEach(panel => {
                    const headerEl = panel.querySelector('.panel-heading h4');
                    if (!headerEl) return;

                    const header = headerEl.innerText.trim();
                    const body = panel.querySelector('.panel-body .content-wrapper');
                    if (!body || !body.innerText.trim()) {
                        result.panels.push({ header, items: null });
                        return;
                    }

                    const items = Array.from(body.querySelectorAll('p')).map(p => {
                        const strong = p.querySelector('strong');
                        if (!strong) return p.innerText.trim();

                        const label = strong.innerText.trim();
                        const br = strong.nextElementSibling;
                        if (br && br.nodeName === 'BR') {
                            const value = (br.nextSibling && br.nextSibling.textContent || '').trim();
                            return { [label]: value };
                        }
                        return { [label]: p.innerText.replace(strong.innerText, '').trim() };
                    });

                    result.panels.push({ header, items });
                });
            }
        } catch (e) {
            console.warn('technical analysis:', e.message);
        }

        try {
            result.totalPercent = text(document.querySelector('p.totalPercent strong'));
            result.domainAge = text(document.querySelector('div.panel-body p'));
            result.domainDate = text(document.querySelector('ul.WOTDetailsList p.orange'));
            result.allData = text(document.querySelector('div.onlinePaymentsSec'));
        } catch (e) {
            console.warn('main info:', e.message);
        }

        return result;
    })()
"#;

/// Build a script returning the first of `selectors` present on the page, or null
pub fn first_present_script(selectors: &[&str]) -> String {
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
    (() => {{
        const selectors = {list};
        for (const sel of selectors) {{
            if (document.querySelector(sel)) return sel;
        }}
        return null;
    }})()
"#
    )
}

/// Build a script clearing the value of the input matched by `selector`
pub fn clear_input_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"
    (() => {{
        const input = document.querySelector({selector});
        if (input) input.value = '';
        return input !== null;
    }})()
"#
    )
}
