//! JSON with comments and trailing commas.
//!
//! Package manifests and font descriptions are hand-edited, so `//` and
//! `/* */` comments and a trailing comma before `]` or `}` are accepted.
//! Both are blanked out in place and the result goes to `serde_json`, which
//! keeps line and column numbers in parse errors accurate.

use serde::de::DeserializeOwned;

use crate::util::Result;

/// Deserialize relaxed JSON.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(&relax(data))?)
}

fn relax(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    strip_comments(&mut out);
    strip_trailing_commas(&mut out);
    out
}

fn strip_comments(out: &mut [u8]) {
    let mut i = 0;
    let mut in_string = false;
    while i < out.len() {
        let b = out[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
            i += 1;
            continue;
        }
        match (b, out.get(i + 1).copied()) {
            (b'"', _) => in_string = true,
            (b'/', Some(b'/')) => {
                let end = out[i..].iter().position(|&c| c == b'\n').map_or(out.len(), |p| i + p);
                blank(&mut out[i..end]);
                i = end;
                continue;
            }
            (b'/', Some(b'*')) => {
                let end = out[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(out.len(), |p| i + 2 + p + 2);
                blank(&mut out[i..end]);
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
}

/// Runs after comments are gone, so only whitespace can sit between a
/// comma and the closing bracket.
fn strip_trailing_commas(out: &mut [u8]) {
    let mut in_string = false;
    let mut escaped = false;
    let mut comma = None;
    for i in 0..out.len() {
        let b = out[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                comma = None;
            }
            b',' => comma = Some(i),
            b']' | b'}' => {
                if let Some(at) = comma.take() {
                    out[at] = b' ';
                }
            }
            b' ' | b'\t' | b'\r' | b'\n' => {}
            _ => comma = None,
        }
    }
}

fn blank(bytes: &mut [u8]) {
    for b in bytes {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}
