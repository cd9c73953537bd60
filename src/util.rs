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

/// Extract the first balanced `{...}` span from free text.
///
/// Models are asked for a single JSON object but routinely wrap it in prose
/// or markdown fences. This scanner is string- and escape-aware so braces
/// inside JSON string values don't break the balance count. Returns the span
/// as-is; the caller decides whether it actually parses.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
  let bytes = text.as_bytes();
  let mut depth: i32 = 0;
  let mut in_string = false;
  let mut escaped = false;
  let mut start_idx: Option<usize> = None;

  for (idx, &byte) in bytes.iter().enumerate() {
    if in_string {
      if escaped {
        escaped = false;
        continue;
      }
      match byte {
        b'\\' => escaped = true,
        b'"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match byte {
      b'"' => {
        if depth > 0 {
          in_string = true;
        }
      }
      b'{' => {
        if depth == 0 {
          start_idx = Some(idx);
        }
        depth += 1;
      }
      b'}' => {
        if depth > 0 {
          depth -= 1;
          if depth == 0 {
            if let Some(start) = start_idx {
              return Some(&text[start..=idx]);
            }
          }
        }
      }
      _ => {}
    }
  }
  None
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_all_occurrences() {
    let out = fill_template("a={x}, again={x}, b={y}", &[("x", "1"), ("y", "2")]);
    assert_eq!(out, "a=1, again=1, b=2");
  }

  #[test]
  fn extracts_plain_object() {
    let got = extract_first_json_object(r#"{"a": 1}"#).unwrap();
    assert_eq!(got, r#"{"a": 1}"#);
  }

  #[test]
  fn extracts_object_surrounded_by_prose() {
    let text = "Gerne! Hier ist der Fall:\n{\"thema\": \"Irrtum\"}\nViel Erfolg!";
    assert_eq!(extract_first_json_object(text).unwrap(), "{\"thema\": \"Irrtum\"}");
  }

  #[test]
  fn keeps_nested_braces_balanced() {
    let text = r#"noise {"outer": {"inner": [1, 2]}, "k": "v"} trailing"#;
    assert_eq!(
      extract_first_json_object(text).unwrap(),
      r#"{"outer": {"inner": [1, 2]}, "k": "v"}"#
    );
  }

  #[test]
  fn braces_inside_strings_do_not_close_the_span() {
    let text = r#"{"text": "ein } in der Mitte", "n": 1}"#;
    assert_eq!(extract_first_json_object(text).unwrap(), text);
  }

  #[test]
  fn escaped_quotes_inside_strings_are_handled() {
    let text = r#"{"text": "er sagte \"hallo\" und {ging}"}"#;
    assert_eq!(extract_first_json_object(text).unwrap(), text);
  }

  #[test]
  fn first_of_multiple_spans_wins() {
    let text = r#"{"first": true} und dann {"second": true}"#;
    assert_eq!(extract_first_json_object(text).unwrap(), r#"{"first": true}"#);
  }

  #[test]
  fn unterminated_object_yields_none() {
    assert!(extract_first_json_object(r#"prose {"a": 1"#).is_none());
    assert!(extract_first_json_object("no braces at all").is_none());
  }

  #[test]
  fn markdown_fence_around_object_is_tolerated() {
    let text = "```json\n{\"a\": 1}\n```";
    assert_eq!(extract_first_json_object(text).unwrap(), "{\"a\": 1}");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "äöü-äöü-äöü";
    let t = trunc_for_log(s, 5);
    assert!(t.contains("bytes total"));
  }
}
