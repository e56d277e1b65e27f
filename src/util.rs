//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Strip a single surrounding fenced code block from a generator response.
///
/// Models frequently wrap JSON in ```json ... ``` despite being asked for a
/// bare object. We remove one leading fence (with an optional language tag on
/// the same line) and one trailing fence, then trim. Text without fences is
/// returned trimmed and otherwise untouched.
pub fn strip_code_fences(raw: &str) -> &str {
  let s = raw.trim();
  let Some(rest) = s.strip_prefix("```") else { return s };
  // Drop the language tag (e.g. "json") up to the first newline.
  let body = match rest.find('\n') {
    Some(i) => &rest[i + 1..],
    None => rest,
  };
  let body = body.strip_suffix("```").unwrap_or(body);
  body.trim()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    s.to_string()
  } else {
    let mut end = max;
    while !s.is_char_boundary(end) {
      end -= 1;
    }
    format!("{}… ({} bytes total)", &s[..end], s.len())
  }
}
