//! In-page locator evaluation.
//!
//! Every [`Locator`] is serialized to JSON and handed to [`LOCATOR_SCRIPT`],
//! which finds the matching elements from scratch and runs one operation on
//! the element the ordinal picks. Nothing is cached between calls.

use crate::error::{DriverError, Result};
use crate::locator::Locator;
use serde_json::Value;

/// `(spec, op, arg) => result`. Failures come back as `{ "error": "..." }`.
pub const LOCATOR_SCRIPT: &str = r#"
(function (spec, op, arg) {
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const matches = (text, wanted, exact) =>
    exact ? norm(text) === norm(wanted) : norm(text).toLowerCase().includes(norm(wanted).toLowerCase());

  const IMPLICIT_ROLES = {
    button: 'button, input[type=button], input[type=submit], input[type=reset]',
    link: 'a[href]',
    textbox: 'input:not([type]), input[type=text], input[type=email], input[type=password], input[type=search], input[type=tel], input[type=url], input[type=number], textarea',
    combobox: 'select',
    checkbox: 'input[type=checkbox]',
    radio: 'input[type=radio]',
    heading: 'h1, h2, h3, h4, h5, h6',
    option: 'option',
    dialog: 'dialog',
  };

  const accessibleName = (el) => {
    const labelled = (el.getAttribute('aria-labelledby') || '').split(/\s+/).filter(Boolean);
    const parts = labelled.map((id) => document.getElementById(id)).filter(Boolean).map((ref) => norm(ref.innerText || ref.textContent));
    if (parts.length) return parts.join(' ');
    return el.getAttribute('aria-label') || el.innerText || el.value || el.getAttribute('title') || '';
  };

  const deepest = (els) => els.filter((el) => !els.some((other) => other !== el && el.contains(other)));

  const query = (root, q) => {
    const all = (sel) => Array.from(root.querySelectorAll(sel));
    switch (q.by) {
      case 'css':
        return all(q.selector);
      case 'xpath': {
        const snap = document.evaluate(q.expr, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        const out = [];
        for (let i = 0; i < snap.snapshotLength; i++) {
          const node = snap.snapshotItem(i);
          if (node.nodeType === Node.ELEMENT_NODE) out.push(node);
        }
        return out;
      }
      case 'test_id':
        return all('[data-testid="' + CSS.escape(q.id) + '"]');
      case 'placeholder':
        return all('[placeholder]').filter((el) => matches(el.getAttribute('placeholder'), q.text, false));
      case 'text':
        return deepest(all('body *').filter((el) => matches(el.innerText, q.text, q.exact)));
      case 'label': {
        const out = [];
        for (const label of all('label')) {
          if (!matches(label.innerText, q.text, q.exact)) continue;
          const control = label.htmlFor ? document.getElementById(label.htmlFor) : label.querySelector('input, textarea, select');
          if (control) out.push(control);
        }
        for (const el of all('[aria-label]')) {
          if (matches(el.getAttribute('aria-label'), q.text, q.exact) && !out.includes(el)) out.push(el);
        }
        return out;
      }
      case 'role': {
        const implicit = IMPLICIT_ROLES[q.role];
        const sel = '[role="' + q.role + '"]' + (implicit ? ', ' + implicit : '');
        let els = all(sel);
        if (q.name != null) els = els.filter((el) => matches(accessibleName(el), q.name, q.exact));
        return els;
      }
      default:
        throw new Error('unknown query ' + q.by);
    }
  };

  const pick = (count, ordinal) => {
    if (ordinal === undefined || ordinal === 'only') return count === 1 ? 0 : -1;
    if (ordinal === 'first') return count > 0 ? 0 : -1;
    if (ordinal === 'last') return count - 1;
    const n = ordinal.nth;
    return n < count ? n : -1;
  };

  const resolve = (loc) => {
    let root = document;
    if (loc.scope) {
      const scoped = resolve(loc.scope);
      if (!scoped.element) return { matched: [], element: null };
      root = scoped.element;
    }
    let found = query(root, loc);
    if (loc.has_text != null) found = found.filter((el) => matches(el.innerText || el.textContent, loc.has_text, false));
    const index = pick(found.length, loc.ordinal);
    return { matched: found, element: index >= 0 ? found[index] : null };
  };

  const visible = (el) => {
    if (!el.isConnected) return false;
    const style = getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };

  const enabled = (el) => !(el.disabled || el.getAttribute('aria-disabled') === 'true' || el.closest('fieldset[disabled]'));

  const setNativeValue = (el, value) => {
    const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    setter.call(el, value);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
  };

  try {
    const { matched, element: el } = resolve(spec);
    if (op === 'inspect') {
      return {
        matched: matched.length,
        attached: !!el,
        visible: !!el && visible(el),
        enabled: !!el && enabled(el),
      };
    }
    if (op === 'all_texts') return matched.map((m) => (visible(m) ? m.innerText || m.textContent || '' : ''));
    if (!el) return { error: 'no element for ' + JSON.stringify(spec) };

    switch (op) {
      case 'scroll':
        el.scrollIntoView({ block: 'center', inline: 'center' });
        return true;
      case 'point': {
        const rect = el.getBoundingClientRect();
        const x = rect.left + rect.width / 2;
        const y = rect.top + rect.height / 2;
        const top = document.elementFromPoint(x, y);
        return { x, y, hit: !!top && (top === el || el.contains(top)) };
      }
      case 'dom_click':
        el.click();
        return true;
      case 'focus':
        el.focus();
        return true;
      case 'set_value':
        el.focus();
        setNativeValue(el, arg);
        return true;
      case 'value':
        return el.value === undefined ? '' : String(el.value);
      case 'text':
        return el.innerText || el.textContent || '';
      default:
        return { error: 'unknown operation ' + op };
    }
  } catch (e) {
    return { error: String(e && e.message ? e.message : e) };
  }
})
"#;

/// Expression applying `op` to the element `locator` picks.
pub fn call(locator: &Locator, op: &str, arg: &Value) -> Result<String> {
    let spec = serde_json::to_string(locator)?;
    let op = serde_json::to_string(op)?;
    let arg = serde_json::to_string(arg)?;
    Ok(format!("{}({}, {}, {})", LOCATOR_SCRIPT.trim(), spec, op, arg))
}

/// Turn an `{ "error": ... }` reply into a `DriverError`.
pub fn check(locator: &Locator, value: Value) -> Result<Value> {
    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(DriverError::Browser(format!("{}: {}", locator, message)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_embeds_locator_json() {
        let locator = Locator::css(".ant-picker-dropdown").last();
        let expr = call(&locator, "inspect", &Value::Null).unwrap();
        assert!(expr.starts_with("(function (spec, op, arg)"));
        assert!(expr.ends_with(
            r#"({"by":"css","selector":".ant-picker-dropdown","ordinal":"last"}, "inspect", null)"#
        ));
    }

    #[test]
    fn test_labelledby_reads_every_id() {
        assert!(LOCATOR_SCRIPT.contains("getAttribute('aria-labelledby') || '').split(/\\s+/)"));
        assert!(LOCATOR_SCRIPT.contains("parts.join(' ')"));
    }

    #[test]
    fn test_check_error_reply() {
        let locator = Locator::css("#missing");
        let reply = serde_json::json!({"error": "no element"});
        assert!(matches!(check(&locator, reply), Err(DriverError::Browser(_))));
        assert_eq!(
            check(&locator, Value::Bool(true)).unwrap(),
            Value::Bool(true)
        );
    }
}
