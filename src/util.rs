//! Small utility helpers used across modules.

/// Single-pass string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Substituted text is never rescanned, so values containing `{...}` survive verbatim.
/// Unknown `{...}` sequences (e.g. literal JSON braces) are copied as-is.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let tail = &rest[open + 1..];
    let hit = tail.find('}').and_then(|close| {
      let key = &tail[..close];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (close, *v))
    });
    match hit {
      Some((close, value)) => {
        out.push_str(value);
        rest = &tail[close + 1..];
      }
      None => {
        out.push('{');
        rest = tail;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
