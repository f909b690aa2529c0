//! The application dialog as a [`FormSurface`].

use super::JobTab;
use crate::form::{ElementProbe, FormSurface, Target, TransitionButton};
use crate::utils::js_escape;
use anyhow::Context;
use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Attribute used to hand a file input over to the DevTools upload call.
const UPLOAD_MARKER: &str = "data-quickapply-upload";

impl JobTab {
    /// JS prelude binding `root` (the application container) and `els` (its
    /// candidate fields, in document order).
    fn fields_prelude(&self) -> String {
        format!(
            "var root = document.querySelector('{}') || document;\n\
             var els = Array.from(root.querySelectorAll('{}'));\n",
            js_escape(&self.selectors.application_container),
            js_escape(&self.selectors.field_elements)
        )
    }

    fn transition_selector(&self, button: TransitionButton) -> &str {
        match button {
            TransitionButton::Review => &self.selectors.review_button,
            TransitionButton::Next => &self.selectors.next_button,
            TransitionButton::Submit => &self.selectors.submit_button,
        }
    }

    fn confirmation_clicked(&self) -> anyhow::Result<bool> {
        self.click(
            &self.selectors.confirmation_button,
            Some(&self.selectors.confirmation_text),
        )
    }
}

impl FormSurface for JobTab {
    fn field_count(&self) -> anyhow::Result<usize> {
        let js = format!("(function(){{ {} return String(els.length); }})()", self.fields_prelude());
        let count = self.eval_string_or(&js, "0")?;
        count
            .parse()
            .with_context(|| format!("Unexpected field count '{}'", count))
    }

    fn probe_field(&self, index: usize) -> anyhow::Result<ElementProbe> {
        let js = format!(
            r#"(function() {{
{prelude}
function text(n) {{ return n ? (n.innerText || n.textContent || '').trim() : null; }}
function labelFor(el) {{
    if (!el.id) return null;
    var l = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
    return l ? text(l) : null;
}}
function caption(el) {{
    var fs = el.closest('fieldset');
    if (fs) {{
        var legend = fs.querySelector('legend');
        if (legend) return text(legend);
    }}
    var group = el.closest('[role="radiogroup"], [role="group"]');
    if (group) {{
        var by = group.getAttribute('aria-labelledby');
        var node = by ? document.getElementById(by) : null;
        if (node) return text(node);
        return group.getAttribute('aria-label');
    }}
    return null;
}}
function sibling(el) {{
    var s = el.previousElementSibling;
    if (!s) return null;
    var nested = s.querySelector('label, span');
    return {{ tag: s.tagName.toLowerCase(), text: text(s) || '', nestedLabel: nested ? text(nested) : null }};
}}
var el = els[{index}];
if (!el) return null;
var type = (el.getAttribute('type') || '').toLowerCase();
var tag = el.tagName.toLowerCase();
var options = [];
var grouped = false;
if (tag === 'select') {{
    options = Array.from(el.options).map(function(o) {{
        return {{ id: '', value: o.value, selected: o.selected, labelFor: null, text: text(o), preceding: null }};
    }});
}} else if (type === 'radio' || type === 'checkbox') {{
    var scope = el.closest('fieldset') || root;
    var members = type === 'radio' && el.name
        ? scope.querySelectorAll('input[type="radio"][name="' + CSS.escape(el.name) + '"]')
        : (el.closest('fieldset') ? scope.querySelectorAll('input[type="checkbox"]') : [el]);
    members = Array.from(members);
    grouped = type === 'radio' || members.length > 1;
    options = members.map(function(o) {{
        var wrap = o.closest('label');
        return {{ id: o.id || '', value: o.value || '', selected: !!o.checked,
                  labelFor: labelFor(o), text: wrap ? text(wrap) : null, preceding: sibling(o) }};
    }});
}}
return JSON.stringify({{
    id: el.id || '', name: el.name || '', tag: tag, inputType: type,
    role: el.getAttribute('role') || '', value: el.value || '', checked: !!el.checked,
    labelFor: grouped ? null : labelFor(el), groupCaption: caption(el),
    preceding: sibling(el), options: options
}});
}})()"#,
            prelude = self.fields_prelude(),
            index = index
        );
        let raw = self
            .eval_string(&js)?
            .ok_or_else(|| anyhow::anyhow!("element #{} disappeared", index))?;
        serde_json::from_str(&raw).with_context(|| format!("Malformed probe for element #{}", index))
    }

    fn fill_text(&self, index: usize, value: &str) -> anyhow::Result<()> {
        let val = js_escape(value);
        let js = format!(
            r#"(function() {{
{prelude}
var el = els[{index}];
if (!el) return false;
var proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
var setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
el.focus();
setter.call(el, '{val}');
el.dispatchEvent(new Event('input', {{ bubbles: true }}));
el.dispatchEvent(new Event('change', {{ bubbles: true }}));
el.blur();
return true;
}})()"#,
            prelude = self.fields_prelude(),
        );
        if !self.eval_bool(&js)? {
            anyhow::bail!("text field #{} not found", index);
        }
        Ok(())
    }

    fn select_value(&self, index: usize, value: &str) -> anyhow::Result<()> {
        let val = js_escape(value);
        let js = format!(
            r#"(function() {{
{prelude}
var el = els[{index}];
if (!el || el.tagName !== 'SELECT') return false;
el.value = '{val}';
el.dispatchEvent(new Event('change', {{ bubbles: true }}));
return el.value === '{val}';
}})()"#,
            prelude = self.fields_prelude(),
        );
        if !self.eval_bool(&js)? {
            anyhow::bail!("could not select '{}' in field #{}", value, index);
        }
        Ok(())
    }

    fn set_checked(&self, target: Target<'_>, checked: bool) -> anyhow::Result<()> {
        let locate = match target {
            Target::Field(index) => format!("{}var el = els[{}];", self.fields_prelude(), index),
            Target::Element(id) => {
                format!("var el = document.getElementById('{}');", js_escape(id))
            }
        };
        let js = format!(
            r#"(function() {{
{locate}
if (!el) return false;
if (el.checked !== {checked}) {{
    el.scrollIntoView({{block: 'center'}});
    el.click();
}}
return el.checked === {checked};
}})()"#
        );
        if !self.eval_bool(&js)? {
            anyhow::bail!("could not set {:?} to {}", target, checked);
        }
        Ok(())
    }

    fn upload_file(&self, index: usize, path: &Path) -> anyhow::Result<()> {
        let mark = format!(
            "(function(){{ {} var el = els[{}]; if (!el) return false; el.setAttribute('{}', '1'); return true; }})()",
            self.fields_prelude(),
            index,
            UPLOAD_MARKER
        );
        if !self.eval_bool(&mark)? {
            anyhow::bail!("file input #{} not found", index);
        }

        let path = path
            .canonicalize()
            .with_context(|| format!("Cannot resolve {}", path.display()))?;
        let path = path.to_string_lossy();
        let result = match self.tab.find_element(&format!("[{}]", UPLOAD_MARKER)) {
            Ok(element) => {
                let uploaded = element.set_input_files(&[&*path]);
                uploaded.map(|_| ())
            }
            Err(e) => Err(e),
        };

        self.eval(&format!(
            "document.querySelectorAll('[{m}]').forEach(function(e){{ e.removeAttribute('{m}'); }})",
            m = UPLOAD_MARKER
        ))?;
        result
    }

    fn progress_value(&self) -> anyhow::Result<Option<u32>> {
        let js = format!(
            r#"(function() {{
var p = document.querySelector('{}');
if (!p) return null;
var v = p.getAttribute('value');
if (v === null || v === '') v = p.value;
var n = parseFloat(v);
return isNaN(n) ? null : String(Math.round(n));
}})()"#,
            js_escape(&self.selectors.progress_meter)
        );
        Ok(self.eval_string(&js)?.and_then(|v| v.parse().ok()))
    }

    fn click_transition(&self, button: TransitionButton) -> anyhow::Result<bool> {
        self.click(self.transition_selector(button), None)
    }

    fn confirm_submission(&self, timeout: Duration) -> anyhow::Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.confirmation_clicked()? {
                log::debug!("Clicked submit confirmation");
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(Duration::from_millis(250));
        }
    }

    fn has_equal_opportunity_section(&self) -> anyhow::Result<bool> {
        let js = format!(
            r#"Array.from(document.querySelectorAll('{}')).some(function(n) {{
    return (n.innerText || '').toLowerCase().indexOf('{}') !== -1;
}})"#,
            js_escape(&self.selectors.equal_opportunity_header),
            js_escape(&self.selectors.equal_opportunity_text.to_lowercase())
        );
        self.eval_bool(&js)
    }

    fn dismiss_application(&self) -> anyhow::Result<()> {
        if !self.click(&self.selectors.dismiss_button, None)? {
            log::debug!("No dismiss button on the application dialog");
            return Ok(());
        }
        self.pause();
        if self.click(&self.selectors.discard_button, Some("Discard"))? {
            log::info!("[*] Discarded the application draft");
        }
        self.pause();
        Ok(())
    }

    fn settle(&self, delay: Duration) {
        sleep(delay);
    }
}
